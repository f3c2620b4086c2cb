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

use super::pci_lookup::PositionalPciLookup;
use crate::domain::catalog::{header, help_text, project, render_json, render_row, validate};
use crate::domain::parsers::{count_pci_devices, is_debug_line, BoardScanner};
use crate::domain::reformat::{BoardLister, DetailEcho};
use crate::domain::{flatten, FlatRecord, LineReformatter, QueryError, ScanOutcome, SmiConfig};
use crate::ports::{
    ApuQueryService, CommandExecutor, DetailScope, LineReader, OutputFormat, PciAttributeSource,
    PciDeviceEnumerator, SystemCommand, VersionProvider,
};
use async_trait::async_trait;
use std::io::Write;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Domain service that implements every query mode
///
/// Each query streams one fresh run of the monitoring command. Queries that
/// correlate chips with PCI devices start the PCI enumeration alongside the
/// stream and hand its result over through a one-shot channel.
pub struct SmiQueryService {
    config: SmiConfig,
    /// Runs the monitoring command and short queries
    command_executor: Arc<dyn CommandExecutor>,
    pci_enumerator: Arc<dyn PciDeviceEnumerator>,
    pci_attributes: Arc<dyn PciAttributeSource>,
    version_provider: Arc<dyn VersionProvider>,
}

impl SmiQueryService {
    /// Create a new query service
    ///
    /// # Arguments
    /// * `config` - Monitoring command name and flags
    /// * `command_executor` - Starts the monitoring command
    /// * `pci_enumerator` - Lists the chips on the PCI bus
    /// * `pci_attributes` - Per-device attribute reader
    /// * `version_provider` - Driver and tool version queries
    pub fn new(
        config: SmiConfig,
        command_executor: Arc<dyn CommandExecutor>,
        pci_enumerator: Arc<dyn PciDeviceEnumerator>,
        pci_attributes: Arc<dyn PciAttributeSource>,
        version_provider: Arc<dyn VersionProvider>,
    ) -> Self {
        Self {
            config,
            command_executor,
            pci_enumerator,
            pci_attributes,
            version_provider,
        }
    }

    pub fn config(&self) -> &SmiConfig {
        &self.config
    }

    async fn lookup_driver_version(&self) -> Option<String> {
        match self.version_provider.driver_version().await {
            Ok(version) => version,
            Err(e) => {
                log::warn!("driver version query failed: {}", e);
                None
            }
        }
    }

    async fn lookup_smi_version(&self) -> Option<String> {
        match self.version_provider.smi_version().await {
            Ok(version) => version,
            Err(e) => {
                log::warn!("{} version query failed: {}", self.config.smi_command, e);
                None
            }
        }
    }

    /// Start the monitoring command and drop its diagnostic preamble
    async fn open_stream(&self, args: &[String]) -> Result<LineReader, QueryError> {
        let command = SystemCommand::new(&self.config.smi_command).args(args);
        let source = self.command_executor.spawn_lines(&command).await?;
        let mut reader = LineReader::new(source);
        let skipped = reader.skip_while(is_debug_line).await?;
        if skipped > 0 {
            log::debug!("dropped {} preamble lines", skipped);
        }
        Ok(reader)
    }

    /// Launch the PCI enumeration and return a lookup waiting on its result
    fn start_pci_enumeration(&self) -> PositionalPciLookup {
        let (sender, receiver) = oneshot::channel();
        let enumerator = Arc::clone(&self.pci_enumerator);
        tokio::spawn(async move {
            let result = enumerator.list_matching_devices().await;
            if sender.send(result).is_err() {
                log::debug!("PCI enumeration finished after the scan");
            }
        });
        PositionalPciLookup::pending(receiver, Arc::clone(&self.pci_attributes))
    }

    fn write_rows(
        records: &[FlatRecord],
        fields: &[String],
        format: OutputFormat,
        out: &mut (dyn Write + Send),
    ) -> Result<(), QueryError> {
        match format {
            OutputFormat::Csv => {
                writeln!(out, "{}", header(fields))?;
                for record in records {
                    writeln!(out, "{}", render_row(&project(record, fields)))?;
                }
            }
            OutputFormat::Json => {
                serde_json::to_writer_pretty(&mut *out, &render_json(records, fields))?;
                writeln!(out)?;
            }
        }
        out.flush()?;
        Ok(())
    }
}

#[async_trait]
impl ApuQueryService for SmiQueryService {
    async fn query_fields(
        &self,
        fields: &str,
        format: OutputFormat,
        out: &mut (dyn Write + Send),
    ) -> Result<usize, QueryError> {
        let fields = validate(fields)?;
        let outcome = self.collect_boards().await?;

        let records: Vec<FlatRecord> = outcome.boards.iter().map(flatten).collect();
        Self::write_rows(&records, &fields, format, out)?;
        Ok(records.len())
    }

    async fn echo_summary(&self, out: &mut (dyn Write + Send)) -> Result<(), QueryError> {
        let (driver_version, smi_version) =
            tokio::join!(self.lookup_driver_version(), self.lookup_smi_version());
        let reformatter = LineReformatter::new(driver_version, smi_version);

        let mut reader = self.open_stream(&[]).await?;
        while let Some(line) = reader.next().await? {
            out.write_all(reformatter.summary(&line).as_bytes())?;
        }
        out.flush()?;
        reader.finish().await?;
        Ok(())
    }

    async fn echo_detail(
        &self,
        scope: DetailScope,
        out: &mut (dyn Write + Send),
    ) -> Result<(), QueryError> {
        let reformatter = LineReformatter::new(self.lookup_driver_version().await, None);

        let mut lookup = self.start_pci_enumeration();
        let mut reader = self
            .open_stream(&self.config.detail_args(scope.board, scope.chip))
            .await?;
        DetailEcho::new(&reformatter, &mut lookup)
            .run(&mut reader, out)
            .await?;
        out.flush()?;
        reader.finish().await?;
        Ok(())
    }

    async fn list_boards(&self, out: &mut (dyn Write + Send)) -> Result<usize, QueryError> {
        let reformatter = LineReformatter::default();
        let mut reader = self.open_stream(&self.config.detail_args(None, None)).await?;

        let listed = BoardLister::default()
            .run(&reformatter, &mut reader, out)
            .await?;
        out.flush()?;
        reader.finish().await?;
        Ok(listed)
    }

    async fn chip_count(&self, out: &mut (dyn Write + Send)) -> Result<usize, QueryError> {
        let listing = self.pci_enumerator.raw_listing().await?;
        let count = count_pci_devices(&listing);
        writeln!(out, "ChipTotalNumbyPci: {}", count)?;
        Ok(count)
    }

    async fn chip_list(&self, out: &mut (dyn Write + Send)) -> Result<(), QueryError> {
        let listing = self.pci_enumerator.raw_listing().await?;
        out.write_all(listing.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    async fn help_fields(&self, out: &mut (dyn Write + Send)) -> Result<(), QueryError> {
        out.write_all(help_text().as_bytes())?;
        Ok(())
    }

    async fn collect_boards(&self) -> Result<ScanOutcome, QueryError> {
        let reformatter = LineReformatter::new(self.lookup_driver_version().await, None);

        let mut lookup = self.start_pci_enumeration();
        let mut reader = self.open_stream(&self.config.detail_args(None, None)).await?;
        let outcome = BoardScanner::new(&reformatter, &mut lookup)
            .scan(&mut reader)
            .await?;
        reader.finish().await?;

        for issue in &outcome.issues {
            log::debug!("scan issue: {:?}", issue);
        }
        Ok(outcome)
    }
}
