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

//! Section markers of the detail output and the line layout behind each one
//!
//! The table is checked top to bottom and the first match wins, so a line
//! never belongs to two sections.

use super::common::{board_info_value, clock_value, utilization_value};
use crate::domain::BoardRecord;

/// Sections recognised in the detail output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionKind {
    Board,
    ProductName,
    ProductBrand,
    ProductNumber,
    DriverVersion,
    FirmwareVersion,
    SerialNumber,
    ChipCount,
    ChipId,
    ApuUtilization,
    CpuUtilization,
    VicUtilization,
    MemoryUtilization,
    IpeFps,
    Pci,
    Fan,
    Temperature,
    Voltage,
    Clocks,
    BoardVoltage,
    PowerLimit,
    PowerDraw,
    EccMode,
    DdrEccErrCount,
}

/// One way of recognising a marker line
#[derive(Debug)]
pub struct Marker {
    /// Substrings that must all be present
    pub all_of: &'static [&'static str],
    /// Substrings that must all be absent
    pub none_of: &'static [&'static str],
}

impl Marker {
    pub fn matches(&self, line: &str) -> bool {
        self.all_of.iter().all(|s| line.contains(s))
            && !self.none_of.iter().any(|s| line.contains(s))
    }
}

/// Where a value sits on a line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueRule {
    BoardInfo,
    Utilization,
    Clock,
}

impl ValueRule {
    pub fn apply(&self, line: &str) -> String {
        match self {
            ValueRule::BoardInfo => board_info_value(line),
            ValueRule::Utilization => utilization_value(line),
            ValueRule::Clock => clock_value(line),
        }
    }
}

/// Board-level string fields of a [`BoardRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarSlot {
    ProductName,
    ProductBrand,
    ProductNumber,
    DriverVersion,
    FirmwareVersion,
    SerialNumber,
    ChipCount,
    ApuTotal,
    CpuTotal,
    VicTotal,
    MemoryTotal,
    IpeFpsTotal,
    FanSpeed,
    BoardInputVoltage,
    PowerLimit,
    PowerDraw,
}

impl ScalarSlot {
    pub fn field_mut(self, record: &mut BoardRecord) -> &mut String {
        match self {
            ScalarSlot::ProductName => &mut record.product_name,
            ScalarSlot::ProductBrand => &mut record.product_brand,
            ScalarSlot::ProductNumber => &mut record.product_number,
            ScalarSlot::DriverVersion => &mut record.driver_version,
            ScalarSlot::FirmwareVersion => &mut record.firmware_version,
            ScalarSlot::SerialNumber => &mut record.serial_number,
            ScalarSlot::ChipCount => &mut record.chip_count,
            ScalarSlot::ApuTotal => &mut record.apu_total,
            ScalarSlot::CpuTotal => &mut record.cpu_total,
            ScalarSlot::VicTotal => &mut record.vic_total,
            ScalarSlot::MemoryTotal => &mut record.memory_total,
            ScalarSlot::IpeFpsTotal => &mut record.ipe_fps_total,
            ScalarSlot::FanSpeed => &mut record.fan_speed,
            ScalarSlot::BoardInputVoltage => &mut record.board_input_voltage,
            ScalarSlot::PowerLimit => &mut record.power_limit,
            ScalarSlot::PowerDraw => &mut record.power_draw,
        }
    }
}

/// Per-chip list fields of a [`BoardRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesSlot {
    ApuUtilization,
    CpuUtilization,
    VicUtilization,
    MemoryUtilization,
    IpeFps,
    Temperatures,
    ChipVoltages,
    ApuClock,
    ApuMaxClock,
    CpuClock,
    CpuMaxClock,
    MemoryClock,
    MemoryMaxClock,
    EccModes,
}

impl SeriesSlot {
    pub fn field_mut(self, record: &mut BoardRecord) -> &mut Vec<String> {
        match self {
            SeriesSlot::ApuUtilization => &mut record.apu_utilization,
            SeriesSlot::CpuUtilization => &mut record.cpu_utilization,
            SeriesSlot::VicUtilization => &mut record.vic_utilization,
            SeriesSlot::MemoryUtilization => &mut record.memory_utilization,
            SeriesSlot::IpeFps => &mut record.ipe_fps,
            SeriesSlot::Temperatures => &mut record.temperatures,
            SeriesSlot::ChipVoltages => &mut record.chip_voltages,
            SeriesSlot::ApuClock => &mut record.clocks.apu_current,
            SeriesSlot::ApuMaxClock => &mut record.clocks.apu_max,
            SeriesSlot::CpuClock => &mut record.clocks.cpu_current,
            SeriesSlot::CpuMaxClock => &mut record.clocks.cpu_max,
            SeriesSlot::MemoryClock => &mut record.clocks.memory_current,
            SeriesSlot::MemoryMaxClock => &mut record.clocks.memory_max,
            SeriesSlot::EccModes => &mut record.ecc_modes,
        }
    }
}

/// A value taken from line `offset` of each chip's block
#[derive(Debug)]
pub struct Cell {
    pub offset: usize,
    pub slot: SeriesSlot,
    pub rule: ValueRule,
}

/// Line layout following a marker
#[derive(Debug)]
pub enum Layout {
    /// Value on the marker line itself
    Inline(ScalarSlot),
    /// Value on the next line, only when that line contains `requires`
    NextLine {
        requires: &'static str,
        slot: ScalarSlot,
    },
    /// A `Total` line followed by one line per chip
    TotalThenChips {
        total: ScalarSlot,
        total_rule: ValueRule,
        chips: SeriesSlot,
    },
    /// `skip_leading` lines, then a fixed-size block per chip
    ChipBlock {
        skip_leading: usize,
        lines_per_chip: usize,
        cells: &'static [Cell],
    },
    /// Handled by a dedicated extractor in the scanner
    Custom,
}

#[derive(Debug)]
pub struct SectionDescriptor {
    pub kind: SectionKind,
    /// Alternatives, any one of which identifies the section
    pub markers: &'static [Marker],
    pub layout: Layout,
}

impl SectionDescriptor {
    pub fn matches(&self, line: &str) -> bool {
        self.markers.iter().any(|m| m.matches(line))
    }
}

const fn contains(marker: &'static [&'static str]) -> Marker {
    Marker {
        all_of: marker,
        none_of: &[],
    }
}

const fn inline(kind: SectionKind, markers: &'static [Marker], slot: ScalarSlot) -> SectionDescriptor {
    SectionDescriptor {
        kind,
        markers,
        layout: Layout::Inline(slot),
    }
}

const fn utilization(
    kind: SectionKind,
    markers: &'static [Marker],
    total: ScalarSlot,
    total_rule: ValueRule,
    chips: SeriesSlot,
) -> SectionDescriptor {
    SectionDescriptor {
        kind,
        markers,
        layout: Layout::TotalThenChips {
            total,
            total_rule,
            chips,
        },
    }
}

pub const TOTAL: &str = "Total";
pub const CHIP: &str = "Chip";
pub const UUID: &str = "UUID";
pub const ECID: &str = "ECID";
pub const CORRECTED_ERR: &str = "Corrected Err";

/// Section table in match priority order
pub static SECTIONS: [SectionDescriptor; 24] = [
    SectionDescriptor {
        kind: SectionKind::Board,
        markers: &[contains(&["Board:"])],
        layout: Layout::Custom,
    },
    inline(SectionKind::ProductName, &[contains(&["Product Name"])], ScalarSlot::ProductName),
    inline(SectionKind::ProductBrand, &[contains(&["Product Brand"])], ScalarSlot::ProductBrand),
    inline(SectionKind::ProductNumber, &[contains(&["Product Number"])], ScalarSlot::ProductNumber),
    inline(SectionKind::DriverVersion, &[contains(&["Driver Version"])], ScalarSlot::DriverVersion),
    inline(
        SectionKind::FirmwareVersion,
        &[contains(&["Firmware Version"])],
        ScalarSlot::FirmwareVersion,
    ),
    inline(SectionKind::SerialNumber, &[contains(&["Serial Number"])], ScalarSlot::SerialNumber),
    inline(SectionKind::ChipCount, &[contains(&["Chip Count"])], ScalarSlot::ChipCount),
    SectionDescriptor {
        kind: SectionKind::ChipId,
        markers: &[contains(&["Chip ID"])],
        layout: Layout::Custom,
    },
    utilization(
        SectionKind::ApuUtilization,
        &[contains(&["APU"])],
        ScalarSlot::ApuTotal,
        ValueRule::Utilization,
        SeriesSlot::ApuUtilization,
    ),
    utilization(
        SectionKind::CpuUtilization,
        &[contains(&["CPU"])],
        ScalarSlot::CpuTotal,
        ValueRule::Utilization,
        SeriesSlot::CpuUtilization,
    ),
    utilization(
        SectionKind::VicUtilization,
        &[contains(&["VIC"])],
        ScalarSlot::VicTotal,
        ValueRule::Utilization,
        SeriesSlot::VicUtilization,
    ),
    utilization(
        SectionKind::MemoryUtilization,
        &[contains(&["Memory"])],
        ScalarSlot::MemoryTotal,
        ValueRule::Utilization,
        SeriesSlot::MemoryUtilization,
    ),
    utilization(
        SectionKind::IpeFps,
        &[contains(&["IPE-FPS"])],
        ScalarSlot::IpeFpsTotal,
        ValueRule::BoardInfo,
        SeriesSlot::IpeFps,
    ),
    SectionDescriptor {
        kind: SectionKind::Pci,
        markers: &[
            Marker {
                all_of: &["PCI"],
                none_of: &["PCIe Generation", "PCIe Switch"],
            },
            contains(&["PCIE"]),
        ],
        layout: Layout::Custom,
    },
    inline(SectionKind::Fan, &[contains(&["Fan"])], ScalarSlot::FanSpeed),
    SectionDescriptor {
        kind: SectionKind::Temperature,
        markers: &[contains(&["Temperature"])],
        // chip header, current, slowdown and shutdown lines
        layout: Layout::ChipBlock {
            skip_leading: 0,
            lines_per_chip: 4,
            cells: &[Cell {
                offset: 1,
                slot: SeriesSlot::Temperatures,
                rule: ValueRule::BoardInfo,
            }],
        },
    },
    SectionDescriptor {
        kind: SectionKind::Voltage,
        markers: &[Marker {
            all_of: &["Voltage"],
            none_of: &["Board Voltage"],
        }],
        layout: Layout::ChipBlock {
            skip_leading: 1,
            lines_per_chip: 1,
            cells: &[Cell {
                offset: 0,
                slot: SeriesSlot::ChipVoltages,
                rule: ValueRule::BoardInfo,
            }],
        },
    },
    SectionDescriptor {
        kind: SectionKind::Clocks,
        markers: &[contains(&["Clocks"])],
        layout: Layout::ChipBlock {
            skip_leading: 0,
            lines_per_chip: 7,
            cells: &[
                Cell {
                    offset: 1,
                    slot: SeriesSlot::ApuClock,
                    rule: ValueRule::Clock,
                },
                Cell {
                    offset: 2,
                    slot: SeriesSlot::ApuMaxClock,
                    rule: ValueRule::Clock,
                },
                Cell {
                    offset: 3,
                    slot: SeriesSlot::CpuClock,
                    rule: ValueRule::Clock,
                },
                Cell {
                    offset: 4,
                    slot: SeriesSlot::CpuMaxClock,
                    rule: ValueRule::Clock,
                },
                Cell {
                    offset: 5,
                    slot: SeriesSlot::MemoryClock,
                    rule: ValueRule::Clock,
                },
                Cell {
                    offset: 6,
                    slot: SeriesSlot::MemoryMaxClock,
                    rule: ValueRule::Clock,
                },
            ],
        },
    },
    SectionDescriptor {
        kind: SectionKind::BoardVoltage,
        markers: &[contains(&["Board Voltage"])],
        layout: Layout::NextLine {
            requires: "Input",
            slot: ScalarSlot::BoardInputVoltage,
        },
    },
    inline(SectionKind::PowerLimit, &[contains(&["Power Limit"])], ScalarSlot::PowerLimit),
    inline(SectionKind::PowerDraw, &[contains(&["Power Draw"])], ScalarSlot::PowerDraw),
    SectionDescriptor {
        kind: SectionKind::EccMode,
        markers: &[contains(&["ECC Mode"])],
        layout: Layout::ChipBlock {
            skip_leading: 0,
            lines_per_chip: 1,
            cells: &[Cell {
                offset: 0,
                slot: SeriesSlot::EccModes,
                rule: ValueRule::BoardInfo,
            }],
        },
    },
    SectionDescriptor {
        kind: SectionKind::DdrEccErrCount,
        markers: &[contains(&["DDR ECC Err Count"])],
        layout: Layout::Custom,
    },
];

/// Find the section a line opens, if any
pub fn classify(line: &str) -> Option<&'static SectionDescriptor> {
    SECTIONS.iter().find(|section| section.matches(line))
}
