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

//! APU SMI Query Library
//!
//! Turns the console output of the `lynxi-smi` monitoring tool into
//! structured per-board records, correlates each chip with its PCI device
//! and projects the records onto a catalog of dotted field names. It uses a
//! Ports and Adapters (Hexagonal) architecture for maintainability and
//! testability.
//!
//! # Architecture
//!
//! - **Domain**: Records, section parsing, flattening, the field catalog and the query service
//! - **Ports**: Interfaces for the command, line stream, PCI and version queries
//! - **Adapters**: tokio process, file and sysfs implementations
//!
//! # Usage
//!
//! ```rust,no_run
//! use apu_smi_query::{ApuQueryService, OutputFormat, ServiceContainer};
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let service = ServiceContainer::default().create_query_service();
//!
//!     let mut out = std::io::stdout();
//!     service
//!         .query_fields("board_index,name,utilization.apu.total", OutputFormat::Csv, &mut out)
//!         .await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod container;
pub mod domain;
pub mod ports;

pub use adapters::{
    FileLineSource, LspciEnumerator, MemoryLineSource, PackageVersionReader, SysfsPciAttributes,
    UnixCommandExecutor,
};
pub use container::{ContainerConfig, ContainerConfigBuilder, ServiceContainer};
pub use domain::{BoardRecord, FlatRecord, QueryError, ScanOutcome, SmiConfig, SmiQueryService};
pub use ports::{
    ApuQueryService, ChipPciLookup, CommandExecutor, DetailScope, LineSource, OutputFormat,
    PciAttributeSource, PciDeviceEnumerator, VersionProvider,
};
