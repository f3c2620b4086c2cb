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

use crate::domain::{QueryError, ScanOutcome};
use async_trait::async_trait;
use std::fmt;
use std::io::Write;
use std::str::FromStr;

/// Rendering of a structured field query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Header row plus one `, ` separated row per board
    #[default]
    Csv,
    /// Array with one object per board
    Json,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            _ => Err("Output format must be either 'csv' or 'json'".to_string()),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            OutputFormat::Csv => write!(f, "csv"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Board and chip a detail query is narrowed to
///
/// A chip is only honoured together with a board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DetailScope {
    pub board: Option<u32>,
    pub chip: Option<u32>,
}

impl DetailScope {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn board(board: u32) -> Self {
        Self {
            board: Some(board),
            chip: None,
        }
    }

    pub fn chip(board: u32, chip: u32) -> Self {
        Self {
            board: Some(board),
            chip: Some(chip),
        }
    }
}

/// Primary port - Every query mode of the APU monitoring front-end
///
/// This is what the CLI and library consumers drive. Each mode writes its
/// rendering to `out` as it goes.
#[async_trait]
pub trait ApuQueryService: Send + Sync {
    /// Run a structured field query
    ///
    /// # Arguments
    /// * `fields` - Comma-separated catalog field names
    /// * `format` - Output rendering
    /// * `out` - Destination of the header and value rows
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of boards written
    /// * `Err(QueryError)` - Validation failure (nothing was run) or I/O failure
    async fn query_fields(
        &self,
        fields: &str,
        format: OutputFormat,
        out: &mut (dyn Write + Send),
    ) -> Result<usize, QueryError>;

    /// Echo the tool's default summary with placeholder, driver and branding substitutions
    async fn echo_summary(&self, out: &mut (dyn Write + Send)) -> Result<(), QueryError>;

    /// Echo the detail output with chip indices and live PCI values substituted
    async fn echo_detail(
        &self,
        scope: DetailScope,
        out: &mut (dyn Write + Send),
    ) -> Result<(), QueryError>;

    /// One summary line per board
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of boards listed
    async fn list_boards(&self, out: &mut (dyn Write + Send)) -> Result<usize, QueryError>;

    /// Number of chips visible on the PCI bus
    async fn chip_count(&self, out: &mut (dyn Write + Send)) -> Result<usize, QueryError>;

    /// Raw PCI enumeration of the chips
    async fn chip_list(&self, out: &mut (dyn Write + Send)) -> Result<(), QueryError>;

    /// Catalog of query-able fields with their descriptions
    async fn help_fields(&self, out: &mut (dyn Write + Send)) -> Result<(), QueryError>;

    /// Scan the detail output into board records without rendering them
    async fn collect_boards(&self) -> Result<ScanOutcome, QueryError>;
}
