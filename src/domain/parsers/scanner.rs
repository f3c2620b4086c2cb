/*
Copyright 2024 San Francisco Compute Company

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! Board scanner: rebuilds [`BoardRecord`]s from the detail output
//!
//! Every line is matched against the section table. Most sections are
//! handled by the generic layouts; the board header, the chip identifier
//! block, the PCI block and the DDR ECC counters have dedicated extractors.
//! A record is sealed when its DDR ECC block has been read, that block
//! being the last one the tool prints for a board.

use super::common::{board_info_value, UNCORRECTED_ERR};
use super::sections::{
    classify, Layout, ScalarSlot, SectionDescriptor, SectionKind, ValueRule, CHIP, CORRECTED_ERR,
    ECID, TOTAL, UUID,
};
use crate::domain::reformat::{chip_index_range, LineReformatter};
use crate::domain::{
    BoardRecord, PciDeviceInfo, PciLookupError, QueryError, ScanIssue, ScanOutcome,
};
use crate::ports::{ChipPciLookup, LineReader};
use std::ops::Range;
use std::time::{SystemTime, UNIX_EPOCH};

/// Highest board-local chip offset that carries PCI correlation
pub const MAX_PCI_CHIP_OFFSET: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AwaitingBoard,
    Accumulating,
}

/// Everything the scan mutates, threaded through each extraction step
#[derive(Debug)]
struct ScanState {
    phase: Phase,
    board_index: usize,
    chip_count: usize,
    chip_count_established: bool,
    record: BoardRecord,
    outcome: ScanOutcome,
}

impl Default for ScanState {
    fn default() -> Self {
        Self {
            phase: Phase::AwaitingBoard,
            board_index: 0,
            chip_count: 0,
            chip_count_established: false,
            record: BoardRecord::default(),
            outcome: ScanOutcome::default(),
        }
    }
}

impl ScanState {
    /// Cumulative indices of the current board's chips, `None` when they
    /// do not fit in `usize`
    fn chip_range(&self) -> Option<Range<usize>> {
        chip_index_range(self.board_index, self.chip_count)
    }

    /// Drop the current board and wait for the next header
    fn skip_board(&mut self, message: String) {
        log::warn!("board {}: {}, skipped", self.record.board_index, message);
        let record = std::mem::take(&mut self.record);
        self.outcome.issues.push(ScanIssue::BoardIndex {
            board_index: record.board_index,
            message,
        });
        self.phase = Phase::AwaitingBoard;
        self.chip_count = 0;
        self.chip_count_established = false;
    }

    fn seal(&mut self) {
        let record = std::mem::take(&mut self.record);
        log::debug!(
            "sealed board {} ({} chips), pci: {:?}",
            record.board_index,
            self.chip_count,
            record
                .pci
                .iter()
                .map(|p| format!("{}:{}.{}", p.bus, p.device, p.function))
                .collect::<Vec<_>>()
        );
        self.outcome.boards.push(record);
        self.phase = Phase::AwaitingBoard;
        self.chip_count = 0;
        self.chip_count_established = false;
    }
}

/// Stateful parser over one detail pass
pub struct BoardScanner<'a> {
    reformatter: &'a LineReformatter,
    lookup: &'a mut dyn ChipPciLookup,
    clock: fn() -> u64,
}

impl<'a> BoardScanner<'a> {
    /// # Arguments
    /// * `reformatter` - Substitutions applied to each line before matching
    /// * `lookup` - PCI side channel for the PCI block
    pub fn new(reformatter: &'a LineReformatter, lookup: &'a mut dyn ChipPciLookup) -> Self {
        Self {
            reformatter,
            lookup,
            clock: unix_now,
        }
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: fn() -> u64) -> Self {
        self.clock = clock;
        self
    }

    /// Scan the stream to its end
    ///
    /// # Returns
    /// * `Ok(ScanOutcome)` - Boards sealed before the stream ended, plus
    ///   per-chip PCI issues that did not abort the pass
    /// * `Err(QueryError)` - A read failure or an unrecoverable PCI failure
    pub async fn scan(mut self, reader: &mut LineReader) -> Result<ScanOutcome, QueryError> {
        let mut state = ScanState::default();

        while let Some(raw) = reader.next().await? {
            let line = self.reformatter.base(&raw);
            let Some(section) = classify(&line) else {
                continue;
            };
            if state.phase == Phase::AwaitingBoard && section.kind != SectionKind::Board {
                continue;
            }
            self.extract(section, &line, reader, &mut state).await?;
        }

        if state.phase == Phase::Accumulating {
            log::debug!(
                "stream ended inside board {}, record dropped",
                state.record.board_index
            );
        }
        log::debug!("board records sealed: {}", state.outcome.boards.len());
        Ok(state.outcome)
    }

    async fn extract(
        &mut self,
        section: &'static SectionDescriptor,
        line: &str,
        reader: &mut LineReader,
        state: &mut ScanState,
    ) -> Result<(), QueryError> {
        match &section.layout {
            Layout::Inline(slot) => self.set_scalar(state, *slot, board_info_value(line)),
            Layout::NextLine { requires, slot } => {
                if let Some(next) = reader.next_if_contains(requires).await? {
                    let next = self.reformatter.base(&next);
                    self.set_scalar(state, *slot, board_info_value(&next));
                }
            }
            Layout::TotalThenChips {
                total,
                total_rule,
                chips,
            } => {
                if let Some(total_line) = reader.next_if_contains(TOTAL).await? {
                    let total_line = self.reformatter.base(&total_line);
                    self.set_scalar(state, *total, total_rule.apply(&total_line));
                    let mut values = Vec::with_capacity(state.chip_count);
                    for _ in 0..state.chip_count {
                        let chip_line = self.read_line(reader).await?;
                        values.push(ValueRule::Utilization.apply(&chip_line));
                    }
                    *chips.field_mut(&mut state.record) = values;
                }
            }
            Layout::ChipBlock {
                skip_leading,
                lines_per_chip,
                cells,
            } => {
                for _ in 0..*skip_leading {
                    self.read_line(reader).await?;
                }
                let mut columns: Vec<Vec<String>> =
                    vec![Vec::with_capacity(state.chip_count); cells.len()];
                for _ in 0..state.chip_count {
                    let mut block = Vec::with_capacity(*lines_per_chip);
                    for _ in 0..*lines_per_chip {
                        block.push(self.read_line(reader).await?);
                    }
                    for (column, cell) in columns.iter_mut().zip(cells.iter()) {
                        let source = block.get(cell.offset).map(String::as_str).unwrap_or("");
                        column.push(cell.rule.apply(source));
                    }
                }
                for (cell, values) in cells.iter().zip(columns) {
                    *cell.slot.field_mut(&mut state.record) = values;
                }
            }
            Layout::Custom => match section.kind {
                SectionKind::Board => self.begin_board(state, line),
                SectionKind::ChipId => self.extract_chip_ids(reader, state).await?,
                SectionKind::Pci => self.extract_pci(state).await?,
                SectionKind::DdrEccErrCount => self.extract_ecc_counters(reader, state).await?,
                other => log::debug!("no extractor for section {:?}", other),
            },
        }
        Ok(())
    }

    /// Next line with substitutions applied; an empty line past the end of
    /// the stream so positional layouts keep their shape
    async fn read_line(&self, reader: &mut LineReader) -> Result<String, QueryError> {
        Ok(reader
            .next()
            .await?
            .map(|line| self.reformatter.base(&line))
            .unwrap_or_default())
    }

    fn set_scalar(&self, state: &mut ScanState, slot: ScalarSlot, value: String) {
        let value = match (slot, self.reformatter.driver_version()) {
            (ScalarSlot::DriverVersion, Some(version)) => version.to_string(),
            _ => value,
        };
        *slot.field_mut(&mut state.record) = value;
    }

    fn begin_board(&self, state: &mut ScanState, line: &str) {
        if state.phase == Phase::Accumulating {
            log::debug!(
                "board {} restarted before its ECC block, partial record dropped",
                state.record.board_index
            );
        }
        let index = board_info_value(line);
        let parsed = index.parse::<usize>();
        state.record = BoardRecord {
            timestamp: (self.clock)().to_string(),
            board_index: index,
            ..Default::default()
        };
        state.chip_count = 0;
        state.chip_count_established = false;
        match parsed {
            Ok(board_index) => {
                state.board_index = board_index;
                state.phase = Phase::Accumulating;
            }
            Err(e) => state.skip_board(format!("board index is not numeric ({})", e)),
        }
    }

    /// Count the contiguous `Chip` lines, derive chip indices and read an
    /// optional UUID/ECID block of the same length
    async fn extract_chip_ids(
        &mut self,
        reader: &mut LineReader,
        state: &mut ScanState,
    ) -> Result<(), QueryError> {
        let mut chip_ids = Vec::new();
        while let Some(line) = reader.next_if_contains(CHIP).await? {
            chip_ids.push(board_info_value(&self.reformatter.base(&line)));
        }

        if state.chip_count_established {
            log::debug!(
                "board {}: repeated Chip ID block ignored",
                state.record.board_index
            );
            return Ok(());
        }

        state.chip_count = chip_ids.len();
        state.chip_count_established = true;
        state.record.chip_count = chip_ids.len().to_string();
        state.record.chip_ids = chip_ids;

        let Some(indices) = state.chip_range() else {
            state.skip_board(format!(
                "cumulative chip indices for {} chips overflow",
                state.chip_count
            ));
            return Ok(());
        };
        state.record.chip_indices = indices.map(|i| i.to_string()).collect();

        let has_identifiers = matches!(
            reader.peek().await?,
            Some(header) if header.contains(UUID) || header.contains(ECID)
        );
        if has_identifiers {
            reader.next().await?;
            let mut uuids = Vec::with_capacity(state.chip_count);
            for _ in 0..state.chip_count {
                uuids.push(board_info_value(&self.read_line(reader).await?));
            }
            state.record.uuids = uuids;
        }
        Ok(())
    }

    /// Resolve every chip of the board through the PCI side channel
    ///
    /// Failures confined to one chip are recorded and leave that chip's
    /// entry empty; read failures abort the pass.
    async fn extract_pci(&mut self, state: &mut ScanState) -> Result<(), QueryError> {
        let Some(indices) = state.chip_range() else {
            state.skip_board(format!(
                "cumulative chip indices for {} chips overflow",
                state.chip_count
            ));
            return Ok(());
        };
        let mut devices = Vec::with_capacity(state.chip_count);

        for (offset, chip_index) in indices.enumerate() {
            let result = if offset > MAX_PCI_CHIP_OFFSET {
                Err(PciLookupError::ChipOffsetOutOfRange { offset })
            } else {
                self.lookup.lookup(chip_index).await
            };

            match result {
                Ok(device) => devices.push(device),
                Err(e) if e.is_recoverable() => {
                    log::warn!("board {}: {}", state.record.board_index, e);
                    state.outcome.issues.push(ScanIssue::PciLookup {
                        board_index: state.record.board_index.clone(),
                        chip_index,
                        message: e.to_string(),
                    });
                    devices.push(PciDeviceInfo::default());
                }
                Err(e) => return Err(e.into()),
            }
        }

        state.record.pci = devices;
        Ok(())
    }

    /// Read the DDR ECC totals and per-chip counters, then seal the record
    async fn extract_ecc_counters(
        &mut self,
        reader: &mut LineReader,
        state: &mut ScanState,
    ) -> Result<(), QueryError> {
        if reader.next_if_contains(TOTAL).await?.is_some() {
            if let Some(line) = reader.next_if_contains(CORRECTED_ERR).await? {
                state.record.ecc_corrected_total = board_info_value(&self.reformatter.base(&line));
            }
            if let Some(line) = reader.next_if_contains(UNCORRECTED_ERR).await? {
                state.record.ecc_uncorrected_total =
                    board_info_value(&self.reformatter.base(&line));
            }
        }

        let per_chip = matches!(reader.peek().await?, Some(line) if line.contains(CHIP));
        let count = state.chip_count;
        if per_chip {
            let mut corrected = Vec::with_capacity(count);
            let mut uncorrected = Vec::with_capacity(count);
            for _ in 0..count {
                self.read_line(reader).await?;
                corrected.push(board_info_value(&self.read_line(reader).await?));
                uncorrected.push(board_info_value(&self.read_line(reader).await?));
            }
            state.record.ecc_corrected = corrected;
            state.record.ecc_uncorrected = uncorrected;
        } else {
            state.record.ecc_corrected = vec![String::new(); count];
            state.record.ecc_uncorrected = vec![String::new(); count];
        }

        state.seal();
        Ok(())
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::MemoryLineSource;
    use async_trait::async_trait;

    const TWO_BOARDS: &str = "\
[ERROR] lynSmi.cpp:120 driver query failed
Board: 0
    Product Name                   : HP300
    Product Brand                  : LYNXI
    Product Number                 : 1002
    Driver Version                 : 1.0.0
    Firmware Version               : 2.3.1
    Serial Number                  : 0123456789
    Chip Count                     : 2
    Chip ID
        Chip0                      : 0x1a2b
        Chip1                      : 0x3c4d
    UUID
        Chip0                      : 7F00112233445566
        Chip1                      : 7F00112233445577
    Utilization
        APU
            Total                  : 44 %
            Chip0                  : 37 %
            Chip1                  : 52 %
        IPE-FPS
            Total                  : 120
            Chip0                  : 60
            Chip1                  : 60
    PCIE
        Chip0
            Vendor ID              : 0x1e9f
    Fan Speed                      : NA
    Temperature
        Chip0
            BIU Current Temp       : 45 C
            BIU Slowdown Temp      : 95 C
            BIU Shutdown Temp      : 105 C
        Chip1
            BIU Current Temp       : 47 C
            BIU Slowdown Temp      : 95 C
            BIU Shutdown Temp      : 105 C
    Voltage
        Chip Voltage
            Chip0                  : 0.85 V
            Chip1                  : 0.86 V
        Board Voltage
            Input                  : 12.10 V
    Clocks
        Chip0
            APU Clock              : 1000 MHz
            APU Max Clock          : 1200 MHz
            CPU Clock              : 1500 MHz
            CPU Max Clock          : 1800 MHz
            Memory Clock           : 3200 MHz
            Memory Max Clock       : 4266 MHz
        Chip1
            APU Clock              : 1010 MHz
            APU Max Clock          : 1200 MHz
            CPU Clock              : 1510 MHz
            CPU Max Clock          : 1800 MHz
            Memory Clock           : 3210 MHz
            Memory Max Clock       : 4266 MHz
    Power
        Power Draw                 : 25.50 W
        Power Limit                : 75.00 W
    ECC Mode
        Chip0                      : Enabled
        Chip1                      : Disabled
    DDR ECC Err Count
        Total
            Corrected Err          : 3
            Uncorrected Err        : 1
        Chip0
            Corrected Err          : 2
            Uncorrected Err        : 1
        Chip1
            Corrected Err          : 1
            Uncorrected Err        : 0
Board: 1
    Product Name                   : HP300
    Chip ID
        Chip0                      : 0x5e6f
        Chip1                      : 0x7a8b
    PCIE
    DDR ECC Err Count
        Total
            Corrected Err          : 0
            Uncorrected Err        : 0
";

    /// Positional lookup over a fixed number of devices
    struct FakeLookup {
        devices: usize,
        fail_reads: bool,
    }

    #[async_trait]
    impl ChipPciLookup for FakeLookup {
        async fn lookup(&mut self, chip_index: usize) -> Result<PciDeviceInfo, PciLookupError> {
            if self.fail_reads {
                return Err(PciLookupError::AttributeRead {
                    path: "/sys/bus/pci/devices/0000:3b:00.0/vendor".into(),
                    source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
                });
            }
            if chip_index >= self.devices {
                return Err(PciLookupError::MissingAddress {
                    chip_index,
                    enumerated: self.devices,
                });
            }
            Ok(PciDeviceInfo {
                vendor_id: "0x1e9f".to_string(),
                bus: format!("{:02x}", 0x3b + chip_index),
                device: "00".to_string(),
                function: "0".to_string(),
                ..Default::default()
            })
        }
    }

    async fn scan_with(
        text: &str,
        reformatter: &LineReformatter,
        lookup: &mut FakeLookup,
    ) -> Result<ScanOutcome, QueryError> {
        let mut reader = LineReader::new(Box::new(MemoryLineSource::new(text)));
        BoardScanner::new(reformatter, lookup)
            .with_clock(|| 1_700_000_000)
            .scan(&mut reader)
            .await
    }

    async fn scan(text: &str, devices: usize) -> ScanOutcome {
        let reformatter = LineReformatter::new(Some("1.12.3".to_string()), None);
        let mut lookup = FakeLookup {
            devices,
            fail_reads: false,
        };
        scan_with(text, &reformatter, &mut lookup).await.unwrap()
    }

    #[tokio::test]
    async fn test_scan_extracts_first_board() {
        let outcome = scan(TWO_BOARDS, 4).await;
        assert_eq!(outcome.boards.len(), 2);
        assert!(outcome.issues.is_empty());

        let board = &outcome.boards[0];
        assert_eq!(board.timestamp, "1700000000");
        assert_eq!(board.board_index, "0");
        assert_eq!(board.product_name, "HP300");
        assert_eq!(board.product_brand, "LYNXI");
        assert_eq!(board.driver_version, "1.12.3");
        assert_eq!(board.firmware_version, "2.3.1");
        assert_eq!(board.chip_count, "2");
        assert_eq!(board.chip_ids, vec!["0x1a2b", "0x3c4d"]);
        assert_eq!(board.uuids, vec!["7F00112233445566", "7F00112233445577"]);
        assert_eq!(board.chip_indices, vec!["0", "1"]);
        assert_eq!(board.apu_total, "44");
        assert_eq!(board.apu_utilization, vec!["37", "52"]);
        assert_eq!(board.ipe_fps_total, "120");
        assert_eq!(board.ipe_fps, vec!["60", "60"]);
        assert_eq!(board.fan_speed, "N/A");
        assert_eq!(board.temperatures, vec!["45", "47"]);
        assert_eq!(board.chip_voltages, vec!["0.85", "0.86"]);
        assert_eq!(board.board_input_voltage, "12.10");
        assert_eq!(board.clocks.apu_current, vec!["1000", "1010"]);
        assert_eq!(board.clocks.memory_max, vec!["4266", "4266"]);
        assert_eq!(board.power_draw, "25.50");
        assert_eq!(board.power_limit, "75.00");
        assert_eq!(board.ecc_modes, vec!["Enabled", "Disabled"]);
        assert_eq!(board.ecc_corrected_total, "3");
        assert_eq!(board.ecc_uncorrected_total, "1");
        assert_eq!(board.ecc_corrected, vec!["2", "1"]);
        assert_eq!(board.ecc_uncorrected, vec!["1", "0"]);
        assert_eq!(board.pci.len(), 2);
        assert_eq!(board.pci[1].bus, "3c");
        // sections the dump does not carry stay empty
        assert!(board.cpu_utilization.is_empty());
        assert_eq!(board.cpu_total, "");
    }

    #[tokio::test]
    async fn test_chip_lists_match_chip_count() {
        let outcome = scan(TWO_BOARDS, 4).await;
        for board in &outcome.boards {
            let count = board.chip_count_value();
            for (name, len) in board.chip_list_lengths() {
                assert!(
                    len == 0 || len == count,
                    "{} has {} entries for {} chips",
                    name,
                    len,
                    count
                );
            }
        }
    }

    #[tokio::test]
    async fn test_second_board_uses_cumulative_chip_indices() {
        let outcome = scan(TWO_BOARDS, 4).await;
        let board = &outcome.boards[1];
        assert_eq!(board.board_index, "1");
        assert_eq!(board.chip_indices, vec!["2", "3"]);
        assert_eq!(board.pci[0].bus, "3d");
        assert_eq!(board.pci[1].bus, "3e");
        // no per-chip counters, so placeholders of the right length
        assert_eq!(board.ecc_corrected, vec!["", ""]);
    }

    #[tokio::test]
    async fn test_short_pci_enumeration_is_reported_not_fatal() {
        let outcome = scan(TWO_BOARDS, 3).await;
        assert_eq!(outcome.boards.len(), 2);
        assert_eq!(
            outcome.issues,
            vec![ScanIssue::PciLookup {
                board_index: "1".to_string(),
                chip_index: 3,
                message: "no PCI device enumerated for chip index 3 (3 devices found)"
                    .to_string(),
            }]
        );

        let board = &outcome.boards[1];
        assert_eq!(board.pci[0].bus, "3d");
        assert_eq!(board.pci[1], PciDeviceInfo::default());
        assert_eq!(board.chip_ids, vec!["0x5e6f", "0x7a8b"]);
    }

    #[tokio::test]
    async fn test_attribute_read_failure_aborts() {
        let reformatter = LineReformatter::default();
        let mut lookup = FakeLookup {
            devices: 4,
            fail_reads: true,
        };
        let result = scan_with(TWO_BOARDS, &reformatter, &mut lookup).await;
        assert!(matches!(
            result,
            Err(QueryError::PciLookup(PciLookupError::AttributeRead { .. }))
        ));
    }

    #[tokio::test]
    async fn test_driver_version_falls_back_to_console_value() {
        let reformatter = LineReformatter::default();
        let mut lookup = FakeLookup {
            devices: 4,
            fail_reads: false,
        };
        let outcome = scan_with(TWO_BOARDS, &reformatter, &mut lookup)
            .await
            .unwrap();
        assert_eq!(outcome.boards[0].driver_version, "1.0.0");
    }

    #[tokio::test]
    async fn test_truncated_board_is_not_sealed() {
        let text = "Board: 0\n    Product Name : HP300\n    Chip ID\n        Chip0 : 0x1\n";
        let outcome = scan(text, 1).await;
        assert!(outcome.boards.is_empty());
    }

    #[tokio::test]
    async fn test_lines_before_first_board_are_ignored() {
        let text = "\
    Product Name : ORPHAN
Board: 0
    DDR ECC Err Count
        Total
            Corrected Err : 0
            Uncorrected Err : 0
";
        let outcome = scan(text, 0).await;
        assert_eq!(outcome.boards.len(), 1);
        assert_eq!(outcome.boards[0].product_name, "");
        assert_eq!(outcome.boards[0].chip_count, "");
    }

    #[tokio::test]
    async fn test_more_than_three_chips_flags_pci_offset() {
        let text = "\
Board: 0
    Chip ID
        Chip0 : a
        Chip1 : b
        Chip2 : c
        Chip3 : d
    PCI
    DDR ECC Err Count
";
        let outcome = scan(text, 8).await;
        let board = &outcome.boards[0];
        assert_eq!(board.pci.len(), 4);
        assert_eq!(board.pci[3], PciDeviceInfo::default());
        assert!(matches!(
            &outcome.issues[..],
            [ScanIssue::PciLookup { chip_index: 3, .. }]
        ));
    }

    #[tokio::test]
    async fn test_non_numeric_board_index_is_skipped() {
        let text = "\
Board: x
    Product Name : HP300
    Chip ID
        Chip0 : 0x1
    PCIE
    DDR ECC Err Count
        Total
            Corrected Err : 0
            Uncorrected Err : 0
Board: 1
    Chip ID
        Chip0 : 0x2
    DDR ECC Err Count
        Total
            Corrected Err : 0
            Uncorrected Err : 0
";
        let outcome = scan(text, 4).await;

        assert_eq!(outcome.boards.len(), 1);
        assert_eq!(outcome.boards[0].board_index, "1");
        assert_eq!(outcome.boards[0].chip_indices, vec!["1"]);
        assert!(matches!(
            &outcome.issues[..],
            [ScanIssue::BoardIndex { board_index, .. }] if board_index == "x"
        ));
    }

    #[tokio::test]
    async fn test_overflowing_chip_indices_skip_the_board() {
        let text = "\
Board: 18446744073709551615
    Chip ID
        Chip0 : 0x1
        Chip1 : 0x2
    PCIE
    DDR ECC Err Count
        Total
            Corrected Err : 0
            Uncorrected Err : 0
";
        let outcome = scan(text, 4).await;

        assert!(outcome.boards.is_empty());
        assert!(matches!(
            &outcome.issues[..],
            [ScanIssue::BoardIndex { board_index, message }]
                if board_index == "18446744073709551615" && message.contains("overflow")
        ));
    }
}
