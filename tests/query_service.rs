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

//! End-to-end query runs over a recorded detail dump and a fake PCI device tree

use apu_smi_query::domain::{
    CommandError, PciLookupError, ScanIssue, SourceError, ValidationError,
};
use apu_smi_query::ports::{CommandOutput, SystemCommand};
use apu_smi_query::{
    ApuQueryService, CommandExecutor, DetailScope, FileLineSource, LineSource, LspciEnumerator,
    MemoryLineSource, OutputFormat, PackageVersionReader, QueryError, SmiConfig, SmiQueryService,
    SysfsPciAttributes,
};
use assert_fs::prelude::*;
use assert_fs::TempDir;
use async_trait::async_trait;
use predicates::prelude::*;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const SUMMARY: &str = "\
Product Name 1.0.0          Driver Version: 1.0.0
    Fan Speed : NA
";

const DEVICES: [&str; 4] = ["3b:00.0", "3c:00.0", "af:00.0", "b0:00.0"];

fn fixture_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/lynxi_smi_detail.txt")
}

/// Plays back recorded output for every external command and remembers what was run
struct RecordedExecutor {
    devices: usize,
    commands: Mutex<Vec<String>>,
}

impl RecordedExecutor {
    fn new(devices: usize) -> Arc<Self> {
        Arc::new(Self {
            devices,
            commands: Mutex::new(Vec::new()),
        })
    }

    fn commands(&self) -> Vec<String> {
        self.commands.lock().unwrap().clone()
    }

    fn listing(&self) -> String {
        DEVICES[..self.devices]
            .iter()
            .map(|address| {
                format!("{} Processing accelerators: Device 1e9f:27c5 (rev 01)\n", address)
            })
            .collect()
    }
}

#[async_trait]
impl CommandExecutor for RecordedExecutor {
    async fn execute(&self, command: &SystemCommand) -> Result<CommandOutput, CommandError> {
        self.commands.lock().unwrap().push(command.display());
        let stdout = match command.program.as_str() {
            "lspci" => self.listing(),
            "dpkg" => "||/ Name       Version   Architecture Description\n\
                       ii  lyndriver  1.12.3    amd64        LYNXI driver\n"
                .to_string(),
            "lynxi-smi" => "lynxi-smi version: 1.5.0\n".to_string(),
            other => {
                return Err(CommandError::ExecutionFailed {
                    command: other.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "not recorded"),
                })
            }
        };
        Ok(CommandOutput {
            stdout,
            success: true,
            exit_code: Some(0),
            ..Default::default()
        })
    }

    async fn spawn_lines(
        &self,
        command: &SystemCommand,
    ) -> Result<Box<dyn LineSource>, SourceError> {
        self.commands.lock().unwrap().push(command.display());
        if command.args.is_empty() {
            return Ok(Box::new(MemoryLineSource::new(SUMMARY)));
        }
        Ok(Box::new(FileLineSource::open(&fixture_path()).await?))
    }
}

/// Device directories named `0000:<address>` with the attribute files of one chip
fn device_tree(addresses: &[&str]) -> TempDir {
    let root = TempDir::new().unwrap();
    for address in addresses {
        let numa_cpus = if address.starts_with('3') {
            "0-15,32-47\n"
        } else {
            "16-31,48-63\n"
        };
        let numa_node = if address.starts_with('3') { "0\n" } else { "1\n" };
        let device = root.child(format!("0000:{}", address));
        device.create_dir_all().unwrap();
        for (name, value) in [
            ("vendor", "0x1e9f\n"),
            ("device", "0x27c5\n"),
            ("subsystem_vendor", "0x1e9f\n"),
            ("subsystem_device", "0x0001\n"),
            ("max_link_speed", "8.0 GT/s PCIe\n"),
            ("max_link_width", "16\n"),
            ("current_link_speed", "8.0 GT/s PCIe\n"),
            ("current_link_width", "16\n"),
            ("numa_node", numa_node),
            ("local_cpulist", numa_cpus),
        ] {
            device.child(name).write_str(value).unwrap();
        }
    }
    root
}

fn service(executor: Arc<RecordedExecutor>, tree: &TempDir) -> SmiQueryService {
    let config = SmiConfig {
        pci_devices_root: tree.path().to_path_buf(),
        ..Default::default()
    };
    let enumerator = LspciEnumerator::new(
        executor.clone(),
        SystemCommand::new(&config.pci_command).args(config.pci_args().as_slice()),
    );
    let attributes = SysfsPciAttributes::new(tree.path(), config.pci_domain_prefix.clone());
    let versions = PackageVersionReader::new(
        executor.clone(),
        SystemCommand::new(&config.package_command).args(&["-l", config.driver_package.as_str()]),
        SystemCommand::new(&config.smi_command).args(&[config.version_flag.as_str()]),
        config.driver_package.clone(),
    );
    SmiQueryService::new(
        config,
        executor,
        Arc::new(enumerator),
        Arc::new(attributes),
        Arc::new(versions),
    )
}

fn aligned(indent: usize, width: usize, label: &str, value: &str) -> String {
    format!("{}{:<width$}: {}\n", " ".repeat(indent), label, value, width = width)
}

#[tokio::test]
async fn test_csv_query_over_two_boards() {
    let executor = RecordedExecutor::new(4);
    let tree = device_tree(&DEVICES);
    let service = service(executor.clone(), &tree);
    let mut out = Vec::new();

    let boards = service
        .query_fields(
            "board_index,name,chip_count,chip_index.chip0,chip_index.chip1,uuid.chip1,\
             utilization.apu.chip0,utilization.apu.chip1,temperature.current.chip1,\
             pci.bus.chip1,pci.numa.cpu.chip0,fan.speed,driver_version,chip_id.chip2",
            OutputFormat::Csv,
            &mut out,
        )
        .await
        .unwrap();

    assert_eq!(boards, 2);
    let text = String::from_utf8(out).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "board_index, name, chip_count, chip_index.chip0, chip_index.chip1, uuid.chip1, \
             utilization.apu.chip0, utilization.apu.chip1, temperature.current.chip1, \
             pci.bus.chip1, pci.numa.cpu.chip0, fan.speed, driver_version, chip_id.chip2",
            "0, HP300, 2, 0, 1, 7F00112233445577, 37, 52, 47, 3c, 0-15 32-47, N/A, 1.12.3, ",
            "1, HP300, 2, 2, 3, , 4, 6, , b0, 16-31 48-63, N/A, 1.12.3, ",
        ]
    );
    assert!(executor.commands().contains(&"lynxi-smi -q".to_string()));
}

#[tokio::test]
async fn test_json_query() {
    let executor = RecordedExecutor::new(4);
    let tree = device_tree(&DEVICES);
    let service = service(executor, &tree);
    let mut out = Vec::new();

    service
        .query_fields(
            "serial_number, pci.vendor_id.chip0, power.draw, clocks.current.apu.chip1",
            OutputFormat::Json,
            &mut out,
        )
        .await
        .unwrap();

    let rows: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(rows.as_array().map(Vec::len), Some(2));
    assert_eq!(rows[0]["serial_number"], "0123456789");
    assert_eq!(rows[0]["pci.vendor_id.chip0"], "0x1e9f");
    assert_eq!(rows[0]["power.draw"], "25.50");
    assert_eq!(rows[0]["clocks.current.apu.chip1"], "1010");
    assert_eq!(rows[1]["serial_number"], "9876543210");
    assert_eq!(rows[1]["power.draw"], "");
}

#[tokio::test]
async fn test_detail_echo_for_one_board() {
    let executor = RecordedExecutor::new(4);
    let tree = device_tree(&DEVICES);
    let service = service(executor.clone(), &tree);
    let mut out = Vec::new();

    service
        .echo_detail(DetailScope::board(1), &mut out)
        .await
        .unwrap();
    let echoed = String::from_utf8(out).unwrap();

    assert!(executor.commands().contains(&"lynxi-smi -q -i 1".to_string()));
    for expected in [
        "    Chip Index\n".to_string(),
        aligned(8, 27, "Chip0", "0"),
        aligned(8, 27, "Chip1", "1"),
        "    PCI\n".to_string(),
        aligned(12, 23, "Vendor ID", "0x1e9f"),
        aligned(12, 23, "Sub Device ID", "0x0001"),
        aligned(12, 23, "Bus Num", "af"),
        aligned(12, 23, "NumaCpuList", "16-31 48-63"),
        aligned(4, 31, "Driver Version", "V1.12.3"),
        aligned(4, 31, "Fan Speed", "N/A"),
    ] {
        assert!(
            predicate::str::contains(expected.as_str()).eval(echoed.as_str()),
            "missing {:?}",
            expected
        );
    }
    assert!(predicate::str::contains("lynSmi.cpp").not().eval(echoed.as_str()));
    assert!(predicate::str::contains("ECID").not().eval(echoed.as_str()));
}

#[tokio::test]
async fn test_summary_echo() {
    let executor = RecordedExecutor::new(4);
    let tree = device_tree(&DEVICES);
    let service = service(executor.clone(), &tree);
    let mut out = Vec::new();

    service.echo_summary(&mut out).await.unwrap();

    assert_eq!(
        String::from_utf8(out).unwrap(),
        "APU-SMI V1.5.0          Driver Version: V1.12.3\n    Fan Speed : N/A\n"
    );
    let commands = executor.commands();
    assert!(commands.contains(&"lynxi-smi".to_string()));
    assert!(commands.contains(&"dpkg -l lyndriver".to_string()));
    assert!(commands.contains(&"lynxi-smi -v".to_string()));
}

#[tokio::test]
async fn test_list_boards() {
    let executor = RecordedExecutor::new(4);
    let tree = device_tree(&DEVICES);
    let service = service(executor, &tree);
    let mut out = Vec::new();

    assert_eq!(service.list_boards(&mut out).await.unwrap(), 2);
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "APU 0: HP300  (SN: 0123456789, ChipCount: 2)\n\
         APU 1: HP300  (SN: 9876543210, ChipCount: 2)\n"
    );
}

#[tokio::test]
async fn test_chip_count_and_listing() {
    let executor = RecordedExecutor::new(4);
    let tree = device_tree(&DEVICES);
    let service = service(executor.clone(), &tree);

    let mut out = Vec::new();
    assert_eq!(service.chip_count(&mut out).await.unwrap(), 4);
    assert_eq!(String::from_utf8(out).unwrap(), "ChipTotalNumbyPci: 4\n");

    let mut out = Vec::new();
    service.chip_list(&mut out).await.unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), executor.listing());
}

#[tokio::test]
async fn test_unknown_field_runs_nothing() {
    let executor = RecordedExecutor::new(4);
    let tree = device_tree(&DEVICES);
    let service = service(executor.clone(), &tree);
    let mut out = Vec::new();

    let err = service
        .query_fields("name,apu.total", OutputFormat::Csv, &mut out)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        QueryError::Validation(ValidationError::UnknownField(ref field)) if field == "apu.total"
    ));
    assert!(out.is_empty());
    assert!(executor.commands().is_empty());
}

#[tokio::test]
async fn test_short_enumeration_is_reported_per_chip() {
    let executor = RecordedExecutor::new(3);
    let tree = device_tree(&DEVICES[..3]);
    let service = service(executor, &tree);

    let outcome = service.collect_boards().await.unwrap();

    assert_eq!(outcome.boards.len(), 2);
    assert_eq!(outcome.boards[1].pci[0].bus, "af");
    assert_eq!(outcome.boards[1].pci[1].bus, "");
    assert!(matches!(
        &outcome.issues[..],
        [ScanIssue::PciLookup { board_index, chip_index: 3, .. }] if board_index == "1"
    ));
}

#[tokio::test]
async fn test_missing_device_tree_aborts_the_scan() {
    let executor = RecordedExecutor::new(4);
    let tree = TempDir::new().unwrap();
    let service = service(executor, &tree);

    let err = service.collect_boards().await.unwrap_err();

    assert!(matches!(
        err,
        QueryError::PciLookup(PciLookupError::AttributeRead { .. })
    ));
}
