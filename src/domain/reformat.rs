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

//! Passthrough reformatting of echoed console text
//!
//! Lines that are echoed rather than parsed get a few substitutions: `NA`
//! placeholders, the installed driver version and the tool branding. The
//! detail echo additionally rewrites chip identifiers and PCI fields with
//! live values, and the board lister condenses a detail dump into one line
//! per board.

use crate::domain::parsers::{
    board_info_value, replace_last_token, trailing_value, MAX_PCI_CHIP_OFFSET, NA_TOKEN_RE,
};
use crate::domain::{PciDeviceInfo, QueryError};
use crate::ports::{ChipPciLookup, LineReader};
use std::io::Write;
use std::ops::Range;

const DRIVER_VERSION: &str = "Driver Version";
const PRODUCT_NAME: &str = "Product Name";
const SERIAL_NUMBER: &str = "Serial Number";
const BOARD: &str = "Board:";
const CHIP_ID: &str = "Chip ID";
const CHIP: &str = "Chip";
const ECID: &str = "ECID";
const UTILIZATION: &str = "Utilization";
const APU_SMI: &str = "APU-SMI";

/// Line-level substitutions with the detected software versions
#[derive(Debug, Clone, Default)]
pub struct LineReformatter {
    driver_version: Option<String>,
    smi_version: Option<String>,
}

impl LineReformatter {
    /// # Arguments
    /// * `driver_version` - Installed driver version without prefix, if known
    /// * `smi_version` - Monitoring tool version without prefix, if known
    pub fn new(driver_version: Option<String>, smi_version: Option<String>) -> Self {
        Self {
            driver_version,
            smi_version,
        }
    }

    pub fn driver_version(&self) -> Option<&str> {
        self.driver_version.as_deref()
    }

    /// Rewrite every standalone `NA` token as `N/A`
    pub fn normalize_na(line: &str) -> String {
        NA_TOKEN_RE.replace_all(line, "N/A").into_owned()
    }

    /// Put the installed driver version in place of the last token of a driver line
    pub fn splice_driver_version(&self, line: &str) -> String {
        match &self.driver_version {
            Some(version) if line.contains(DRIVER_VERSION) => {
                replace_last_token(line, &format!("V{}", version))
            }
            _ => line.to_string(),
        }
    }

    /// Rebrand the summary header: `Product Name` becomes `APU-SMI` and its
    /// second space-separated token becomes the tool version
    pub fn rebrand_product_name(&self, line: &str) -> String {
        if !line.contains(PRODUCT_NAME) {
            return line.to_string();
        }
        let line = line.replace(PRODUCT_NAME, APU_SMI);
        let Some(version) = &self.smi_version else {
            return line;
        };

        let rebranded = {
            let mut tokens: Vec<String> = line.split(' ').map(str::to_string).collect();
            match tokens.get_mut(1) {
                Some(token) if !token.trim().is_empty() => {
                    let newline = if token.ends_with('\n') { "\n" } else { "" };
                    *token = format!("V{}{}", version, newline);
                    Some(tokens.join(" "))
                }
                _ => None,
            }
        };
        rebranded.unwrap_or(line)
    }

    /// Substitutions applied to every line of a detail pass
    pub fn base(&self, line: &str) -> String {
        self.splice_driver_version(&Self::normalize_na(line))
    }

    /// Substitutions applied to the summary echo
    pub fn summary(&self, line: &str) -> String {
        let line = Self::normalize_na(line);
        let line = self.rebrand_product_name(&line);
        self.splice_driver_version(&line)
    }
}

/// Cumulative index of the first chip on a board
///
/// Assumes every board carries the same number of chips. `None` when the
/// index does not fit in a `usize`.
pub fn first_chip_index(board_index: usize, chip_count: usize) -> Option<usize> {
    board_index.checked_mul(chip_count)
}

/// Cumulative indices of every chip on a board
pub fn chip_index_range(board_index: usize, chip_count: usize) -> Option<Range<usize>> {
    let first = first_chip_index(board_index, chip_count)?;
    Some(first..first.checked_add(chip_count)?)
}

/// Echo of the detail output with chip indices and live PCI values
///
/// Tracks the board currently printed, the chip count announced by its
/// `Chip ID` block and which chip of the board the current PCI block
/// belongs to.
pub struct DetailEcho<'a> {
    reformatter: &'a LineReformatter,
    lookup: &'a mut dyn ChipPciLookup,
    /// `None` while the current board header carries no numeric index
    board_index: Option<usize>,
    chip_count: usize,
    pci_board: Option<usize>,
    pci_offset: Option<usize>,
    pci_device: Option<PciDeviceInfo>,
}

impl<'a> DetailEcho<'a> {
    pub fn new(reformatter: &'a LineReformatter, lookup: &'a mut dyn ChipPciLookup) -> Self {
        Self {
            reformatter,
            lookup,
            board_index: Some(0),
            chip_count: 0,
            pci_board: Some(0),
            pci_offset: None,
            pci_device: None,
        }
    }

    /// Echo the whole stream to `out`
    pub async fn run<W: Write + Send + ?Sized>(
        &mut self,
        reader: &mut LineReader,
        out: &mut W,
    ) -> Result<(), QueryError> {
        while let Some(raw) = reader.next().await? {
            let line = self.reformatter.base(&raw);
            if line.contains(BOARD) {
                let index = board_info_value(&line);
                self.board_index = index.parse().ok();
                if self.board_index.is_none() {
                    log::warn!(
                        "board index '{}' is not numeric, chip indices and PCI fields echoed as printed",
                        index
                    );
                }
            }
            if line.trim().is_empty() {
                out.write_all(line.as_bytes())?;
                continue;
            }

            if line.contains(CHIP_ID) {
                out.write_all(line.as_bytes())?;
                self.chip_count = 0;
                while let Some(chip) = reader.next_if_contains(CHIP).await? {
                    out.write_all(self.reformatter.base(&chip).as_bytes())?;
                    self.chip_count += 1;
                }
                continue;
            }

            if line.contains(ECID) {
                self.echo_chip_indices(&line, reader, out).await?;
                continue;
            }

            let line = self.update_pci_line(&line).await;
            out.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    /// Rename the ECID header and put cumulative chip indices on its lines
    async fn echo_chip_indices<W: Write + Send + ?Sized>(
        &mut self,
        header: &str,
        reader: &mut LineReader,
        out: &mut W,
    ) -> Result<(), QueryError> {
        out.write_all(header.replace(ECID, "Chip Index").as_bytes())?;
        let indices = self
            .board_index
            .and_then(|board| chip_index_range(board, self.chip_count));
        if indices.is_none() {
            log::warn!("board {}: no cumulative chip indices", self.board_label());
        }
        for i in 0..self.chip_count {
            let Some(line) = reader.next().await? else {
                break;
            };
            let line = match &indices {
                Some(range) => replace_last_token(&line, &(range.start + i).to_string()),
                None => line,
            };
            out.write_all(line.as_bytes())?;
        }
        Ok(())
    }

    async fn update_pci_line(&mut self, line: &str) -> String {
        if line.contains("PCIE") && !line.contains("Generation") {
            return line.replace("PCIE", "PCI");
        }

        let is_sub = line.contains("Sub");
        if line.contains("Vendor ID") && !is_sub {
            self.advance_pci_chip().await;
            return self.with_device(line, |d| d.vendor_id.clone());
        }
        if line.contains("Device ID") && !is_sub {
            return self.with_device(line, |d| d.device_id.clone());
        }
        if line.contains("Sub Vendor ID") {
            return self.with_device(line, |d| d.sub_vendor_id.clone());
        }
        if line.contains("Sub Device ID") {
            let replaced = self.with_device(line, |d| d.sub_device_id.clone());
            return match &self.pci_device {
                Some(device) => format!("{}{}", replaced, extra_pci_lines(line, device)),
                None => replaced,
            };
        }
        line.to_string()
    }

    /// A non-sub `Vendor ID` line opens the PCI block of the next chip
    async fn advance_pci_chip(&mut self) {
        if self.pci_board == self.board_index {
            self.pci_offset = Some(self.pci_offset.map_or(0, |offset| offset + 1));
        } else {
            self.pci_board = self.board_index;
            self.pci_offset = Some(0);
        }

        let offset = self.pci_offset.unwrap_or(0);
        let chip_index = self
            .board_index
            .and_then(|board| first_chip_index(board, self.chip_count))
            .and_then(|first| first.checked_add(offset));
        self.pci_device = match chip_index {
            _ if offset > MAX_PCI_CHIP_OFFSET => {
                log::warn!(
                    "board {}: PCI chip offset {} out of range",
                    self.board_label(),
                    offset
                );
                None
            }
            None => {
                log::warn!(
                    "board {}: no cumulative index for PCI chip offset {}",
                    self.board_label(),
                    offset
                );
                None
            }
            Some(chip_index) => match self.lookup.lookup(chip_index).await {
                Ok(device) => Some(device),
                Err(e) => {
                    log::warn!("board {}: {}", self.board_label(), e);
                    None
                }
            },
        };
    }

    fn board_label(&self) -> String {
        self.board_index
            .map_or_else(|| "?".to_string(), |board| board.to_string())
    }

    fn with_device<F>(&self, line: &str, value: F) -> String
    where
        F: Fn(&PciDeviceInfo) -> String,
    {
        match &self.pci_device {
            Some(device) => replace_last_token(line, &value(device)),
            None => line.to_string(),
        }
    }
}

/// Bus, link and NUMA lines appended after a `Sub Device ID` line, aligned with it
fn extra_pci_lines(line: &str, device: &PciDeviceInfo) -> String {
    let indent_len = line.len() - line.trim_start().len();
    let indent = &line[..indent_len];
    let width = line
        .find(':')
        .map(|colon| colon.saturating_sub(indent_len))
        .unwrap_or(0);

    [
        ("Bus Num", &device.bus),
        ("Device", &device.device),
        ("Function", &device.function),
        ("Max Speed", &device.max_link_speed),
        ("Current Speed", &device.current_link_speed),
        ("NumaNodeId", &device.numa_node_id),
        ("NumaCpuList", &device.numa_cpu_list),
    ]
    .iter()
    .map(|(label, value)| {
        let label = format!("{:<width$}", label, width = width.max(label.len() + 1));
        format!("{}{}: {}\n", indent, label, value)
    })
    .collect()
}

/// One summary line per board of a detail dump
#[derive(Debug, Default)]
pub struct BoardLister {
    board_index: String,
    product_name: String,
    serial_number: String,
    chip_count: usize,
}

impl BoardLister {
    pub async fn run<W: Write + Send + ?Sized>(
        &mut self,
        reformatter: &LineReformatter,
        reader: &mut LineReader,
        out: &mut W,
    ) -> Result<usize, QueryError> {
        let mut listed = 0;
        while let Some(raw) = reader.next().await? {
            let line = reformatter.base(&raw);
            if line.contains(BOARD) {
                self.board_index = board_info_value(&line);
            }
            if line.contains(PRODUCT_NAME) {
                self.product_name = trailing_value(&line);
            }
            if line.contains(SERIAL_NUMBER) {
                self.serial_number = trailing_value(&line);
            }
            if line.contains(CHIP_ID) {
                self.chip_count = 0;
                while reader.next_if_contains(CHIP).await?.is_some() {
                    self.chip_count += 1;
                }
            }
            if line.contains(UTILIZATION) {
                writeln!(out, "{}", self.summary_line())?;
                listed += 1;
            }
        }
        Ok(listed)
    }

    fn summary_line(&self) -> String {
        format!(
            "APU {}: {}  (SN: {}, ChipCount: {})",
            self.board_index, self.product_name, self.serial_number, self.chip_count
        )
    }
}
