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

//! Version queries backed by the package manager and the tool's version flag

use crate::domain::parsers::{parse_driver_version, parse_smi_version};
use crate::domain::QueryError;
use crate::ports::{CommandExecutor, SystemCommand, VersionProvider};
use async_trait::async_trait;
use std::sync::Arc;

pub struct PackageVersionReader {
    executor: Arc<dyn CommandExecutor>,
    /// `dpkg -l <driver package>`
    package_query: SystemCommand,
    /// `<smi command> <version flag>`
    smi_query: SystemCommand,
    driver_package: String,
}

impl PackageVersionReader {
    pub fn new(
        executor: Arc<dyn CommandExecutor>,
        package_query: SystemCommand,
        smi_query: SystemCommand,
        driver_package: impl Into<String>,
    ) -> Self {
        Self {
            executor,
            package_query,
            smi_query,
            driver_package: driver_package.into(),
        }
    }
}

#[async_trait]
impl VersionProvider for PackageVersionReader {
    async fn driver_version(&self) -> Result<Option<String>, QueryError> {
        let output = self.executor.execute(&self.package_query).await?;
        let version = parse_driver_version(&output.stdout, &self.driver_package);
        if version.is_none() {
            log::debug!("no installed row for package {}", self.driver_package);
        }
        Ok(version)
    }

    async fn smi_version(&self) -> Result<Option<String>, QueryError> {
        let output = self.executor.execute(&self.smi_query).await?;
        Ok(parse_smi_version(&output.stdout))
    }
}
