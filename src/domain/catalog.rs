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

//! Field catalog and projection
//!
//! The catalog is the documented set of flat keys a caller may query. Keys
//! follow `<domain>.<metric>[.<qualifier>][.chip<N>]`; per-chip keys are
//! published for the first [`CATALOG_CHIPS`] chips of a board.

use crate::domain::flatten::chip_key;
use crate::domain::{FlatRecord, ValidationError};
use lazy_static::lazy_static;
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Chips per board covered by the catalog
pub const CATALOG_CHIPS: usize = 3;

/// Column separator of header and value rows
pub const SEPARATOR: &str = ", ";

/// One query-able field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub description: String,
}

impl FieldSpec {
    fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

lazy_static! {
    static ref CATALOG: Vec<FieldSpec> = build_catalog();
    static ref CATALOG_NAMES: HashSet<&'static str> =
        CATALOG.iter().map(|field| field.name.as_str()).collect();
}

fn per_chip(
    fields: &mut Vec<FieldSpec>,
    prefix: &str,
    describe: impl Fn(usize) -> String,
) {
    for chip in 0..CATALOG_CHIPS {
        fields.push(FieldSpec::new(chip_key(prefix, chip), describe(chip)));
    }
}

fn build_catalog() -> Vec<FieldSpec> {
    let mut fields = vec![
        FieldSpec::new(
            "timestamp",
            "The timestamp of when the query was made in format timestamp.",
        ),
        FieldSpec::new(
            "board_index",
            "Zero based index of the APU board. Can change at each boot.",
        ),
        FieldSpec::new("name", "the product name of the APU board."),
        FieldSpec::new("product_brand", "the product brand of the APU board."),
        FieldSpec::new("product_number", "the product number of the APU board."),
        FieldSpec::new(
            "driver_version",
            "The version of the installed LYNXI display driver. This is an alphanumeric string.",
        ),
        FieldSpec::new(
            "firmware_version",
            "The version of the installed LYNXI display firmware driver.",
        ),
        FieldSpec::new(
            "serial_number",
            "This number matches the serial number physically printed on each board. \
             It is a globally unique immutable alphanumeric value.",
        ),
        FieldSpec::new("chip_count", "The number of LYNXI APUs in the system."),
    ];

    per_chip(&mut fields, "chip_id", |i| {
        format!("This value is the globally unique immutable alphanumeric identifier of the APU{}", i)
    });
    per_chip(&mut fields, "uuid", |i| {
        format!(
            "This value is the globally unique immutable alphanumeric identifier of the APU{}. \
             It does not correspond to any physical label on the board.",
            i
        )
    });
    per_chip(&mut fields, "chip_index", |i| {
        format!("Zero based index of the APU{}. Can change at each boot.", i)
    });

    for (metric, unit) in [
        ("apu", "apu"),
        ("cpu", "cpu"),
        ("vic", "vic"),
        ("memory", "memory"),
        ("ipeFps", "ipe"),
    ] {
        let prefix = format!("utilization.{}", metric);
        fields.push(FieldSpec::new(
            format!("{}.total", prefix),
            format!(
                "Percent of time over the past sample period during which global (device) {} was being read or written.",
                unit
            ),
        ));
        per_chip(&mut fields, &prefix, |i| {
            format!(
                "Percent of time over the past sample period during which global (APU{}) {} was being read or written.",
                i, unit
            )
        });
    }

    for name in [
        "sub_vendor_id",
        "vendor_id",
        "bus",
        "device_id",
        "sub_device_id",
        "device",
        "function",
    ] {
        let prefix = format!("pci.{}", name);
        per_chip(&mut fields, &prefix, |i| format!("{}, in hex.", chip_key(&prefix, i)));
    }
    for name in ["pci.numa.node_id", "pci.numa.cpu"] {
        per_chip(&mut fields, name, |i| format!("{}.", chip_key(name, i)));
    }
    per_chip(&mut fields, "pcie.link.speed.max", |_| {
        "The maximum PCI-E link width possible with this APU and system configuration. \
         For example, if the APU supports a higher PCIe generation than the system supports \
         then this reports the system PCIe generation."
            .to_string()
    });
    per_chip(&mut fields, "pcie.link.speed.current", |_| {
        "The current PCI-E link width. These may be reduced when the APU is not in use.".to_string()
    });
    per_chip(&mut fields, "pcie.link.gen.max", |_| {
        "The maximum PCI-E link generation possible with this APU and system configuration. \
         For example, if the APU supports a higher PCIe generation than the system supports \
         then this reports the system PCIe generation."
            .to_string()
    });
    per_chip(&mut fields, "pcie.link.gen.current", |_| {
        "The current PCI-E link generation. These may be reduced when the APU is not in use."
            .to_string()
    });

    fields.push(FieldSpec::new("fan.speed", "Fan speed, in %."));
    per_chip(&mut fields, "temperature.current", |i| {
        format!("Core APU{} temperature. in degrees C.", i)
    });
    per_chip(&mut fields, "voltage.current", |i| {
        format!("Current APU{} Voltage. in voltage V.", i)
    });
    fields.push(FieldSpec::new("voltage.board.input", "Voltage board input."));

    for clock in ["apu", "cpu", "memory"] {
        per_chip(&mut fields, &format!("clocks.current.{}", clock), |i| {
            format!("Current {} frequency of APU{} clock.", clock, i)
        });
    }
    for clock in ["apu", "cpu", "memory"] {
        per_chip(&mut fields, &format!("clocks.current.{}.max", clock), |i| {
            format!("Current max {} frequency of APU{} clock.", clock, i)
        });
    }

    fields.push(FieldSpec::new(
        "power.draw",
        "The last measured power draw for the entire board, in watts. \
         Only available if power management is supported.",
    ));
    fields.push(FieldSpec::new(
        "power.limit",
        "The software power limit in watts.",
    ));
    per_chip(&mut fields, "ecc.mode.current", |i| {
        format!("Current Ecc mode APU{}.", i)
    });
    for kind in ["corrected", "uncorrected"] {
        let prefix = format!("ecc.errors.{}.total", kind);
        fields.push(FieldSpec::new(
            prefix.clone(),
            "Errors detected in global device memory.",
        ));
        per_chip(&mut fields, &prefix, |i| format!("Errors detected in the APU{}.", i));
    }

    fields
}

/// Every catalog field, in catalog order
pub fn catalog() -> &'static [FieldSpec] {
    &CATALOG
}

/// Whether `name` is a query-able field
pub fn is_known_field(name: &str) -> bool {
    CATALOG_NAMES.contains(name)
}

/// Validate a comma-separated field list
///
/// Names are trimmed, duplicates keep their first position, and the first
/// unknown name fails the whole list.
///
/// # Arguments
/// * `raw` - Caller supplied list such as `"name,utilization.apu.chip0"`
///
/// # Returns
/// * `Ok(Vec<String>)` - Ordered, deduplicated field names
/// * `Err(ValidationError)` - Empty list or first unknown name
pub fn validate(raw: &str) -> Result<Vec<String>, ValidationError> {
    if raw.trim().is_empty() {
        return Err(ValidationError::EmptyFieldList);
    }

    let mut seen = HashSet::new();
    let mut fields = Vec::new();
    for name in raw.split(',').map(str::trim) {
        if !is_known_field(name) {
            return Err(ValidationError::UnknownField(name.to_string()));
        }
        if seen.insert(name) {
            fields.push(name.to_string());
        }
    }
    Ok(fields)
}

/// Values of `fields` in `record`, empty where the record has no such key
pub fn project(record: &FlatRecord, fields: &[String]) -> Vec<String> {
    fields
        .iter()
        .map(|field| record.get(field).cloned().unwrap_or_default())
        .collect()
}

pub fn header(fields: &[String]) -> String {
    fields.join(SEPARATOR)
}

pub fn render_row(values: &[String]) -> String {
    values.join(SEPARATOR)
}

/// One JSON object per record, keyed by field name
pub fn render_json(records: &[FlatRecord], fields: &[String]) -> Value {
    let rows = records
        .iter()
        .map(|record| {
            let object: Map<String, Value> = fields
                .iter()
                .zip(project(record, fields))
                .map(|(field, value)| (field.clone(), Value::String(value)))
                .collect();
            Value::Object(object)
        })
        .collect();
    Value::Array(rows)
}

/// Listing printed for the field help mode
pub fn help_text() -> String {
    let mut text = String::from("List of valid properties to query for the switch query-apu:\n\n");
    for field in catalog() {
        text.push_str(&format!("\"{}\"\n{}\n\n", field.name, field.description));
    }
    text
}
