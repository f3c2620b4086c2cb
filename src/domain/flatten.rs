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

//! Expansion of a nested [`BoardRecord`] into `<metric>[.chip<N>]` keys

use crate::domain::{BoardRecord, FlatRecord, PciDeviceInfo};

/// Chip suffix of a flat key
pub fn chip_key(prefix: &str, chip: usize) -> String {
    format!("{}.chip{}", prefix, chip)
}

/// Flatten one board record
///
/// Board-level scalars keep their key. Each chip list contributes one key
/// per chip in `[0, chip_count)`; a list the source never printed
/// contributes nothing, so projecting it yields an empty value.
pub fn flatten(record: &BoardRecord) -> FlatRecord {
    let chips = record.chip_count_value();
    let mut flat = FlatRecord::new();

    let scalars: [(&str, &String); 20] = [
        ("timestamp", &record.timestamp),
        ("board_index", &record.board_index),
        ("name", &record.product_name),
        ("product_brand", &record.product_brand),
        ("product_number", &record.product_number),
        ("driver_version", &record.driver_version),
        ("firmware_version", &record.firmware_version),
        ("serial_number", &record.serial_number),
        ("chip_count", &record.chip_count),
        ("utilization.apu.total", &record.apu_total),
        ("utilization.cpu.total", &record.cpu_total),
        ("utilization.vic.total", &record.vic_total),
        ("utilization.memory.total", &record.memory_total),
        ("utilization.ipeFps.total", &record.ipe_fps_total),
        ("fan.speed", &record.fan_speed),
        ("voltage.board.input", &record.board_input_voltage),
        ("power.draw", &record.power_draw),
        ("power.limit", &record.power_limit),
        ("ecc.errors.corrected.total", &record.ecc_corrected_total),
        ("ecc.errors.uncorrected.total", &record.ecc_uncorrected_total),
    ];
    for (key, value) in scalars {
        flat.insert(key.to_string(), value.clone());
    }

    let lists: [(&str, &Vec<String>); 19] = [
        ("chip_id", &record.chip_ids),
        ("uuid", &record.uuids),
        ("chip_index", &record.chip_indices),
        ("utilization.apu", &record.apu_utilization),
        ("utilization.cpu", &record.cpu_utilization),
        ("utilization.vic", &record.vic_utilization),
        ("utilization.memory", &record.memory_utilization),
        ("utilization.ipeFps", &record.ipe_fps),
        ("temperature.current", &record.temperatures),
        ("voltage.current", &record.chip_voltages),
        ("clocks.current.apu", &record.clocks.apu_current),
        ("clocks.current.cpu", &record.clocks.cpu_current),
        ("clocks.current.memory", &record.clocks.memory_current),
        ("clocks.current.apu.max", &record.clocks.apu_max),
        ("clocks.current.cpu.max", &record.clocks.cpu_max),
        ("clocks.current.memory.max", &record.clocks.memory_max),
        ("ecc.mode.current", &record.ecc_modes),
        ("ecc.errors.corrected.total", &record.ecc_corrected),
        ("ecc.errors.uncorrected.total", &record.ecc_uncorrected),
    ];
    for (prefix, values) in lists {
        for (chip, value) in values.iter().take(chips).enumerate() {
            flat.insert(chip_key(prefix, chip), value.clone());
        }
    }

    for (chip, device) in record.pci.iter().take(chips).enumerate() {
        for (prefix, value) in pci_fields(device) {
            flat.insert(chip_key(prefix, chip), value.clone());
        }
    }

    flat
}

fn pci_fields(device: &PciDeviceInfo) -> [(&'static str, &String); 13] {
    [
        ("pci.sub_vendor_id", &device.sub_vendor_id),
        ("pci.vendor_id", &device.vendor_id),
        ("pci.bus", &device.bus),
        ("pci.device_id", &device.device_id),
        ("pci.sub_device_id", &device.sub_device_id),
        ("pci.device", &device.device),
        ("pci.function", &device.function),
        ("pci.numa.node_id", &device.numa_node_id),
        ("pci.numa.cpu", &device.numa_cpu_list),
        ("pcie.link.speed.max", &device.max_link_speed),
        ("pcie.link.speed.current", &device.current_link_speed),
        ("pcie.link.gen.max", &device.max_link_width),
        ("pcie.link.gen.current", &device.current_link_width),
    ]
}
