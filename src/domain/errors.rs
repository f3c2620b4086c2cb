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

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Command execution errors for short-lived queries (lspci, dpkg, version flag)
#[derive(Debug, Error)]
pub enum CommandError {
    /// The program could not be started or its output could not be collected
    #[error("Failed to execute command '{command}': {source}")]
    ExecutionFailed {
        command: String,
        #[source]
        source: io::Error,
    },
    /// The command did not finish within its timeout
    #[error("Command '{command}' timed out after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },
}

/// Errors raised by a streaming line source (spawned process or file)
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Failed to start '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },
    #[error("Failed to open '{}': {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("I/O error while reading {origin}: {source}")]
    Read {
        origin: String,
        #[source]
        source: io::Error,
    },
}

/// Query field list validation errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Field \"{0}\" is not a valid field to query.")]
    UnknownField(String),
    #[error("No fields were given to query.")]
    EmptyFieldList,
}

/// Failures correlating a chip with its PCI side-channel entry
#[derive(Debug, Error)]
pub enum PciLookupError {
    /// The enumeration returned fewer devices than the chip index arithmetic needs
    #[error("no PCI device enumerated for chip index {chip_index} ({enumerated} devices found)")]
    MissingAddress { chip_index: usize, enumerated: usize },
    #[error("malformed PCI bus address '{0}'")]
    MalformedAddress(String),
    /// Only the first three chips of a board carry a PCI offset
    #[error("PCI chip offset {offset} is out of range")]
    ChipOffsetOutOfRange { offset: usize },
    #[error("PCI enumeration failed: {0}")]
    Enumeration(String),
    #[error("failed to read PCI attribute '{}': {source}", path.display())]
    AttributeRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl PciLookupError {
    /// Whether the failure is confined to one chip and the scan can continue
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PciLookupError::MissingAddress { .. }
                | PciLookupError::MalformedAddress(_)
                | PciLookupError::ChipOffsetOutOfRange { .. }
        )
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Errors returned by the query service
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    PciLookup(#[from] PciLookupError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Failed to write output: {0}")]
    Output(#[from] io::Error),
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}
