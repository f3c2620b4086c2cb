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

//! PCI enumeration output parsing

/// Parse `lspci -d <vendor>:<device>` output into ordered bus addresses
///
/// Each non-blank line contributes its first whitespace-delimited token.
/// Order is preserved since it is what ties a device to a chip index.
///
/// # Arguments
/// * `output` - Raw enumeration output
///
/// # Returns
/// * Bus addresses such as `e5:00.0`, in enumeration order
pub fn parse_pci_enumeration(output: &str) -> Vec<String> {
    output
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .map(str::to_string)
        .collect()
}

/// Number of devices listed by the enumeration output
pub fn count_pci_devices(output: &str) -> usize {
    output.lines().filter(|line| !line.trim().is_empty()).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LSPCI: &str = "\
3b:00.0 Processing accelerators: Device 1e9f:27c5 (rev 01)
3c:00.0 Processing accelerators: Device 1e9f:27c5 (rev 01)

af:00.0 Processing accelerators: Device 1e9f:27c5 (rev 01)
";

    #[test]
    fn test_parse_pci_enumeration_keeps_order() {
        assert_eq!(
            parse_pci_enumeration(LSPCI),
            vec!["3b:00.0", "3c:00.0", "af:00.0"]
        );
    }

    #[test]
    fn test_empty_enumeration() {
        assert!(parse_pci_enumeration("").is_empty());
        assert_eq!(count_pci_devices(""), 0);
    }

    #[test]
    fn test_count_pci_devices_skips_blank_lines() {
        assert_eq!(count_pci_devices(LSPCI), 3);
    }
}
