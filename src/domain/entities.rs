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

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One physical board as rebuilt from the monitoring command's detail output.
///
/// Numeric values stay as the console printed them. Every per-chip list is
/// either empty (the section was absent) or exactly `chip_count` long.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct BoardRecord {
    /// Unix timestamp taken when the board marker was read
    pub timestamp: String,
    pub board_index: String,
    pub product_name: String,
    pub product_brand: String,
    pub product_number: String,
    pub driver_version: String,
    pub firmware_version: String,
    pub serial_number: String,
    pub chip_count: String,
    pub chip_ids: Vec<String>,
    /// Only filled when the source prints a UUID/ECID block
    pub uuids: Vec<String>,
    /// Cumulative system-wide chip indices
    pub chip_indices: Vec<String>,
    pub apu_total: String,
    pub apu_utilization: Vec<String>,
    pub cpu_total: String,
    pub cpu_utilization: Vec<String>,
    pub vic_total: String,
    pub vic_utilization: Vec<String>,
    pub memory_total: String,
    pub memory_utilization: Vec<String>,
    pub ipe_fps_total: String,
    pub ipe_fps: Vec<String>,
    pub temperatures: Vec<String>,
    pub fan_speed: String,
    pub chip_voltages: Vec<String>,
    pub board_input_voltage: String,
    pub power_draw: String,
    pub power_limit: String,
    pub ecc_modes: Vec<String>,
    pub ecc_corrected_total: String,
    pub ecc_uncorrected_total: String,
    pub ecc_corrected: Vec<String>,
    pub ecc_uncorrected: Vec<String>,
    pub pci: Vec<PciDeviceInfo>,
    pub clocks: ClocksInfo,
}

impl BoardRecord {
    /// Chip count as established by the scanner, zero when unknown
    pub fn chip_count_value(&self) -> usize {
        self.chip_count.trim().parse().unwrap_or(0)
    }

    /// Lengths of every chip-indexed list, labelled for diagnostics
    pub fn chip_list_lengths(&self) -> Vec<(&'static str, usize)> {
        vec![
            ("chip_ids", self.chip_ids.len()),
            ("uuids", self.uuids.len()),
            ("chip_indices", self.chip_indices.len()),
            ("apu_utilization", self.apu_utilization.len()),
            ("cpu_utilization", self.cpu_utilization.len()),
            ("vic_utilization", self.vic_utilization.len()),
            ("memory_utilization", self.memory_utilization.len()),
            ("ipe_fps", self.ipe_fps.len()),
            ("temperatures", self.temperatures.len()),
            ("chip_voltages", self.chip_voltages.len()),
            ("ecc_modes", self.ecc_modes.len()),
            ("ecc_corrected", self.ecc_corrected.len()),
            ("ecc_uncorrected", self.ecc_uncorrected.len()),
            ("pci", self.pci.len()),
            ("clocks.apu_current", self.clocks.apu_current.len()),
            ("clocks.apu_max", self.clocks.apu_max.len()),
            ("clocks.cpu_current", self.clocks.cpu_current.len()),
            ("clocks.cpu_max", self.clocks.cpu_max.len()),
            ("clocks.memory_current", self.clocks.memory_current.len()),
            ("clocks.memory_max", self.clocks.memory_max.len()),
        ]
    }
}

/// PCI attributes of one chip, read from the OS device tree
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct PciDeviceInfo {
    pub vendor_id: String,
    pub device_id: String,
    pub sub_vendor_id: String,
    pub sub_device_id: String,
    pub bus: String,
    pub device: String,
    pub function: String,
    pub max_link_speed: String,
    pub max_link_width: String,
    pub current_link_speed: String,
    pub current_link_width: String,
    pub numa_node_id: String,
    /// Comma separators already replaced by spaces
    pub numa_cpu_list: String,
}

/// Per-chip clock lists
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ClocksInfo {
    pub apu_current: Vec<String>,
    pub apu_max: Vec<String>,
    pub cpu_current: Vec<String>,
    pub cpu_max: Vec<String>,
    pub memory_current: Vec<String>,
    pub memory_max: Vec<String>,
}

/// A board flattened to `<metric>[.chip<N>]` keys
pub type FlatRecord = BTreeMap<String, String>;

/// Something the scanner could not resolve but that did not abort the pass
#[derive(Debug, Clone, PartialEq)]
pub enum ScanIssue {
    /// The board could not be placed in the cumulative chip numbering and was skipped
    BoardIndex {
        board_index: String,
        message: String,
    },
    PciLookup {
        board_index: String,
        chip_index: usize,
        message: String,
    },
}

/// Result of one scan pass over the detail output
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    /// Sealed boards in the order they appeared
    pub boards: Vec<BoardRecord>,
    pub issues: Vec<ScanIssue>,
}
