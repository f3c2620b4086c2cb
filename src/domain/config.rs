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

//! Query configuration: external command names, flags and the PCI device tree location

use crate::domain::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Settings for talking to the monitoring command and the OS PCI interfaces
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SmiConfig {
    /// Monitoring command
    pub smi_command: String,
    pub detail_flag: String,
    pub board_flag: String,
    pub chip_flag: String,
    pub version_flag: String,
    /// PCI enumeration command, invoked as `<pci_command> -d <pci_filter>`
    pub pci_command: String,
    pub pci_filter: String,
    /// Package manager queried for the driver version
    pub package_command: String,
    pub driver_package: String,
    pub pci_devices_root: PathBuf,
    /// Prepended to the enumerated bus address to form the device directory name
    pub pci_domain_prefix: String,
    /// Timeout for short queries; streaming sources are never timed out
    pub command_timeout_secs: u64,
}

impl Default for SmiConfig {
    fn default() -> Self {
        Self {
            smi_command: "lynxi-smi".to_string(),
            detail_flag: "-q".to_string(),
            board_flag: "-i".to_string(),
            chip_flag: "-c".to_string(),
            version_flag: "-v".to_string(),
            pci_command: "lspci".to_string(),
            pci_filter: "1e9f:27c5".to_string(),
            package_command: "dpkg".to_string(),
            driver_package: "lyndriver".to_string(),
            pci_devices_root: PathBuf::from("/sys/bus/pci/devices"),
            pci_domain_prefix: "0000:".to_string(),
            command_timeout_secs: 30,
        }
    }
}

impl SmiConfig {
    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Load a TOML config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Arguments for the PCI enumeration command
    pub fn pci_args(&self) -> Vec<String> {
        vec!["-d".to_string(), self.pci_filter.clone()]
    }

    /// Arguments for a detail query, optionally scoped to a board and chip
    pub fn detail_args(&self, board: Option<u32>, chip: Option<u32>) -> Vec<String> {
        let mut args = vec![self.detail_flag.clone()];
        if let Some(board) = board {
            args.push(self.board_flag.clone());
            args.push(board.to_string());
            if let Some(chip) = chip {
                args.push(self.chip_flag.clone());
                args.push(chip.to_string());
            }
        }
        args
    }
}
