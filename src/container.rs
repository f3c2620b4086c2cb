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

//! Dependency injection container for the query service

use crate::adapters::{
    LspciEnumerator, PackageVersionReader, SysfsPciAttributes, UnixCommandExecutor,
};
use crate::domain::{ConfigError, SmiConfig, SmiQueryService};
use crate::ports::{
    ApuQueryService, CommandExecutor, PciAttributeSource, PciDeviceEnumerator, SystemCommand,
    VersionProvider,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for the dependency injection container
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContainerConfig {
    /// Commands, flags and device tree location
    pub smi: SmiConfig,
    /// Enable verbose logging
    pub verbose: bool,
}

impl ContainerConfig {
    /// Default `env_logger` filter when `RUST_LOG` is unset
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else {
            "warn"
        }
    }
}

/// Dependency injection container
pub struct ServiceContainer {
    config: ContainerConfig,
}

impl ServiceContainer {
    /// Create a new service container with configuration
    pub fn new(config: ContainerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ContainerConfig {
        &self.config
    }

    /// Create the command executor
    pub fn create_command_executor(&self) -> Arc<dyn CommandExecutor> {
        Arc::new(UnixCommandExecutor::new(self.config.smi.command_timeout()))
    }

    /// Create the PCI enumerator over `lspci -d <filter>`
    pub fn create_pci_enumerator(
        &self,
        executor: Arc<dyn CommandExecutor>,
    ) -> Arc<dyn PciDeviceEnumerator> {
        let smi = &self.config.smi;
        let command = SystemCommand::new(&smi.pci_command).args(smi.pci_args().as_slice());
        Arc::new(LspciEnumerator::new(executor, command))
    }

    /// Create the sysfs attribute reader
    pub fn create_pci_attributes(&self) -> Arc<dyn PciAttributeSource> {
        let smi = &self.config.smi;
        Arc::new(SysfsPciAttributes::new(
            smi.pci_devices_root.clone(),
            smi.pci_domain_prefix.clone(),
        ))
    }

    /// Create the driver and tool version queries
    pub fn create_version_provider(
        &self,
        executor: Arc<dyn CommandExecutor>,
    ) -> Arc<dyn VersionProvider> {
        let smi = &self.config.smi;
        let package_query =
            SystemCommand::new(&smi.package_command).args(&["-l", smi.driver_package.as_str()]);
        let smi_query = SystemCommand::new(&smi.smi_command).args(&[smi.version_flag.as_str()]);
        Arc::new(PackageVersionReader::new(
            executor,
            package_query,
            smi_query,
            smi.driver_package.clone(),
        ))
    }

    /// Create the complete query service
    pub fn create_query_service(&self) -> Arc<dyn ApuQueryService> {
        let executor = self.create_command_executor();
        let service = SmiQueryService::new(
            self.config.smi.clone(),
            Arc::clone(&executor),
            self.create_pci_enumerator(Arc::clone(&executor)),
            self.create_pci_attributes(),
            self.create_version_provider(executor),
        );
        Arc::new(service)
    }
}

impl Default for ServiceContainer {
    fn default() -> Self {
        Self::new(ContainerConfig::default())
    }
}

/// Builder pattern for container configuration
pub struct ContainerConfigBuilder {
    config: ContainerConfig,
}

impl ContainerConfigBuilder {
    /// Create a new configuration builder
    pub fn new() -> Self {
        Self {
            config: ContainerConfig::default(),
        }
    }

    /// Replace the query settings
    pub fn smi_config(mut self, smi: SmiConfig) -> Self {
        self.config.smi = smi;
        self
    }

    /// Load the query settings from a TOML file
    pub fn config_file(mut self, path: &Path) -> Result<Self, ConfigError> {
        self.config.smi = SmiConfig::load(path)?;
        Ok(self)
    }

    /// Set the timeout of short queries
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.config.smi.command_timeout_secs = timeout.as_secs();
        self
    }

    /// Enable verbose logging
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.config.verbose = verbose;
        self
    }

    /// Build the configuration
    pub fn build(self) -> ContainerConfig {
        self.config
    }
}

impl Default for ContainerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
