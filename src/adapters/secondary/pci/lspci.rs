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

//! PCI enumeration through `lspci -d <vendor>:<device>`

use crate::domain::parsers::parse_pci_enumeration;
use crate::domain::QueryError;
use crate::ports::{CommandExecutor, PciDeviceEnumerator, SystemCommand};
use async_trait::async_trait;
use std::sync::Arc;

pub struct LspciEnumerator {
    executor: Arc<dyn CommandExecutor>,
    command: SystemCommand,
}

impl LspciEnumerator {
    /// # Arguments
    /// * `executor` - Runs the enumeration command
    /// * `command` - Fully built enumeration command, filter included
    pub fn new(executor: Arc<dyn CommandExecutor>, command: SystemCommand) -> Self {
        Self { executor, command }
    }
}

#[async_trait]
impl PciDeviceEnumerator for LspciEnumerator {
    async fn raw_listing(&self) -> Result<String, QueryError> {
        let output = self.executor.execute(&self.command).await?;
        if !output.success {
            log::warn!(
                "'{}' exited with {:?}: {}",
                self.command.display(),
                output.exit_code,
                output.stderr.trim()
            );
        }
        Ok(output.stdout)
    }

    async fn list_matching_devices(&self) -> Result<Vec<String>, QueryError> {
        let listing = self.raw_listing().await?;
        let addresses = parse_pci_enumeration(&listing);
        log::debug!("{} enumerated {} devices", self.command.program, addresses.len());
        Ok(addresses)
    }
}
