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

//! Common parsing utilities and helper functions
//!
//! The console output is not self-describing, so each helper encodes one
//! positional rule for where the value sits on a line.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    pub static ref NA_TOKEN_RE: Regex = Regex::new(r"\bNA\b").unwrap();
    pub static ref DPKG_VERSION_RE: Regex =
        Regex::new(r"^ii\s+\S+\s+(\d+\.\d+\.\d+)").unwrap();
    pub static ref PCI_ADDRESS_RE: Regex =
        Regex::new(r"^(?:([0-9A-Fa-f]{4}):)?([0-9A-Fa-f]{2}):([0-9A-Fa-f]{2})\.([0-7])$")
            .unwrap();
}

pub const UNCORRECTED_ERR: &str = "Uncorrected Err";

/// Markers of the diagnostic preamble some driver builds print before real output
const DEBUG_MARKERS: [&str; 4] = ["ERROR", "lynSmi.cpp", "SN", "***"];

/// Extract the value of a `Label : value unit` style line
///
/// With a colon the value is the text after the last colon. Without one the
/// value is the second-to-last space-separated token (the last one being a
/// unit), except for `Uncorrected Err` lines which carry no unit and use the
/// last token. Values carrying a `V`, `C` or `W` keep only their first word,
/// which drops the unit.
///
/// # Arguments
/// * `line` - Raw console line, trailing newline allowed
///
/// # Returns
/// * Extracted value, empty when the line has no usable token
pub fn board_info_value(line: &str) -> String {
    let value = if line.contains(':') {
        line.rsplit(':').next().unwrap_or_default().trim().to_string()
    } else {
        let tokens: Vec<&str> = line.split(' ').collect();
        let index = if line.contains(UNCORRECTED_ERR) {
            tokens.len().saturating_sub(1)
        } else {
            tokens.len().saturating_sub(2)
        };
        tokens.get(index).map(|t| t.trim()).unwrap_or_default().to_string()
    };

    if value.contains('V') || value.contains('C') || value.contains('W') {
        return value.split(' ').next().unwrap_or_default().to_string();
    }
    value
}

/// Extract a utilization figure such as `Total   37 %` or `Chip0   52`
///
/// The value is the last space-separated token, or the one before it when
/// the line carries a `%` unit.
pub fn utilization_value(line: &str) -> String {
    let from_end = if line.contains('%') { 2 } else { 1 };
    let tokens: Vec<&str> = line.split(' ').collect();
    tokens
        .len()
        .checked_sub(from_end)
        .and_then(|i| tokens.get(i))
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

/// Extract a clock frequency, dropping any unit that follows it
pub fn clock_value(line: &str) -> String {
    board_info_value(line)
        .split(' ')
        .next()
        .unwrap_or_default()
        .to_string()
}

/// Text after the last colon, trimmed
pub fn trailing_value(line: &str) -> String {
    line.rsplit(':').next().unwrap_or_default().trim().to_string()
}

/// Replace the last space-separated token of a line, keeping its line ending
pub fn replace_last_token(line: &str, value: &str) -> String {
    let newline = if line.ends_with('\n') { "\n" } else { "" };
    let body = line.strip_suffix('\n').unwrap_or(line);
    match body.rfind(' ') {
        Some(pos) => format!("{} {}{}", &body[..pos], value, newline),
        None => format!("{}{}", value, newline),
    }
}

/// Remove every line break from a value read from a file or a console line
pub fn strip_line_break(value: &str) -> String {
    value.replace('\n', "").replace('\r', "")
}

/// Whether a line belongs to the diagnostic preamble
pub fn is_debug_line(line: &str) -> bool {
    DEBUG_MARKERS.iter().any(|marker| line.contains(marker))
}

/// Parse the installed driver version from `dpkg -l <package>` output
///
/// # Arguments
/// * `output` - Raw dpkg listing
/// * `package` - Package name whose row should be used
///
/// # Returns
/// * `Some("1.12.3")` - Version without prefix
/// * `None` - No installed row for the package
pub fn parse_driver_version(output: &str, package: &str) -> Option<String> {
    output
        .lines()
        .filter(|line| line.contains(package))
        .find_map(|line| DPKG_VERSION_RE.captures(line).map(|c| c[1].to_string()))
}

/// Parse the tool version from the monitoring command's version flag output
///
/// Uses the last non-diagnostic line carrying a colon and returns the text
/// between its first and second colon.
pub fn parse_smi_version(output: &str) -> Option<String> {
    output
        .lines()
        .filter(|line| !is_debug_line(line) && line.contains(':'))
        .last()
        .and_then(|line| line.split(':').nth(1))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Split a `[domain:]bus:device.function` address into bus, device and function
pub fn split_pci_address(address: &str) -> Option<(String, String, String)> {
    PCI_ADDRESS_RE.captures(address.trim()).map(|c| {
        (
            c[2].to_string(),
            c[3].to_string(),
            c[4].to_string(),
        )
    })
}

/// Device directory name of an enumerated address
///
/// Addresses printed with their domain (`lspci -D`, multi-domain hosts) are
/// used as they are; bare `bus:device.function` addresses get `domain_prefix`.
pub fn qualify_pci_address(address: &str, domain_prefix: &str) -> String {
    let address = address.trim();
    let has_domain = PCI_ADDRESS_RE
        .captures(address)
        .map_or(false, |c| c.get(1).is_some());
    if has_domain {
        address.to_string()
    } else {
        format!("{}{}", domain_prefix, address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_board_info_value_colon_delimited() {
        assert_eq!(board_info_value("    Product Name    : HP300\n"), "HP300");
        assert_eq!(board_info_value("Board: 1\n"), "1");
        assert_eq!(board_info_value("        Chip0 : 45 C\n"), "45");
        assert_eq!(board_info_value("    Power Draw : 25.50 W\n"), "25.50");
        assert_eq!(board_info_value("        Chip1 : 0.85 V\n"), "0.85");
    }

    #[test]
    fn test_board_info_value_space_delimited() {
        assert_eq!(board_info_value("    Fan Speed 30 %\n"), "30");
        assert_eq!(board_info_value("    Corrected Err 3 \n"), "3");
        // no unit, so the last token holds the value
        assert_eq!(board_info_value("    Uncorrected Err 7\n"), "7");
    }

    #[test]
    fn test_utilization_value() {
        assert_eq!(utilization_value("        Total      37 %\n"), "37");
        assert_eq!(utilization_value("        Chip1      52\n"), "52");
        assert_eq!(utilization_value(""), "");
    }

    #[test]
    fn test_clock_value() {
        assert_eq!(clock_value("            APU Clock : 1000 MHz\n"), "1000");
    }

    #[test]
    fn test_replace_last_token() {
        assert_eq!(
            replace_last_token("    Driver Version : 1.0.0\n", "V1.12.3"),
            "    Driver Version : V1.12.3\n"
        );
        assert_eq!(replace_last_token("solo", "x"), "x");
    }

    #[test]
    fn test_parse_driver_version() {
        let output = "Desired=Unknown/Install/Remove/Purge/Hold\n\
                      ii  lyndriver      1.12.3      amd64   LYNXI driver\n";
        assert_eq!(
            parse_driver_version(output, "lyndriver"),
            Some("1.12.3".to_string())
        );
        assert_eq!(parse_driver_version(output, "lynsdk"), None);
    }

    #[test]
    fn test_parse_smi_version() {
        let output = "[ERROR] lynSmi.cpp:42 init failed\nlynxi-smi version: 1.5.0\n";
        assert_eq!(parse_smi_version(output), Some("1.5.0".to_string()));
        assert_eq!(parse_smi_version("no version here\n"), None);
    }

    #[test]
    fn test_split_pci_address() {
        assert_eq!(
            split_pci_address("e5:00.0"),
            Some(("e5".to_string(), "00".to_string(), "0".to_string()))
        );
        assert_eq!(split_pci_address("garbage"), None);
    }

    #[test]
    fn test_domain_qualified_pci_address() {
        assert_eq!(
            split_pci_address("0001:3b:00.0"),
            Some(("3b".to_string(), "00".to_string(), "0".to_string()))
        );
        assert_eq!(qualify_pci_address("0001:3b:00.0", "0000:"), "0001:3b:00.0");
        assert_eq!(qualify_pci_address("3b:00.0", "0000:"), "0000:3b:00.0");
    }

    #[test]
    fn test_is_debug_line() {
        assert!(is_debug_line("[ERROR] lynSmi.cpp:10 init\n"));
        assert!(is_debug_line("*** banner ***\n"));
        assert!(!is_debug_line("Board: 0\n"));
    }
}
