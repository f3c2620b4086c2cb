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

use crate::domain::QueryError;
use async_trait::async_trait;

/// Secondary port - Installed software version queries
#[async_trait]
pub trait VersionProvider: Send + Sync {
    /// Installed driver version without prefix, e.g. `1.12.3`
    ///
    /// # Returns
    /// * `Ok(Some(version))` - Driver package is installed
    /// * `Ok(None)` - No installed package row was found
    /// * `Err(QueryError)` - The query could not run
    async fn driver_version(&self) -> Result<Option<String>, QueryError>;

    /// Monitoring tool version without prefix, e.g. `1.5.0`
    async fn smi_version(&self) -> Result<Option<String>, QueryError>;
}
