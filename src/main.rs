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

use apu_smi_query::domain::ConfigError;
use apu_smi_query::{
    ApuQueryService, ContainerConfig, ContainerConfigBuilder, DetailScope, OutputFormat,
    ServiceContainer,
};
use clap::{ArgGroup, Parser};
use std::error::Error;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// Structured queries over the lynxi-smi monitoring tool
#[derive(Parser, Debug)]
#[command(name = "lynxi-smi-pro", version, about)]
#[command(group(
    ArgGroup::new("mode")
        .args(["query", "query_apu", "list_apus", "chip_count", "chip_list", "help_query_apu"])
        .multiple(false)
))]
struct Cli {
    /// Print the detail output with chip indices and live PCI values
    #[arg(short = 'q', long)]
    query: bool,

    /// Narrow the detail output to one board
    #[arg(short = 'i', long, requires = "query")]
    index: Option<u32>,

    /// Narrow the detail output to one chip of the board given with --index
    #[arg(short = 'c', long = "chip_id", requires = "index")]
    chip_id: Option<u32>,

    /// Comma-separated fields to query, see --help-query-apu
    #[arg(long, value_name = "FIELDS")]
    query_apu: Option<String>,

    /// Rendering of --query-apu results (csv or json)
    #[arg(long, default_value_t = OutputFormat::Csv)]
    format: OutputFormat,

    /// List the boards with their serial number and chip count
    #[arg(short = 'L', long)]
    list_apus: bool,

    /// Count the chips on the PCI bus
    #[arg(long)]
    chip_count: bool,

    /// Print the PCI enumeration of the chips
    #[arg(long)]
    chip_list: bool,

    /// List the fields accepted by --query-apu
    #[arg(long)]
    help_query_apu: bool,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,

    /// TOML file overriding command names, flags and the PCI device tree location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

impl Cli {
    fn detail_scope(&self) -> DetailScope {
        match (self.index, self.chip_id) {
            (Some(board), Some(chip)) => DetailScope::chip(board, chip),
            (Some(board), None) => DetailScope::board(board),
            _ => DetailScope::all(),
        }
    }

    fn container_config(&self) -> Result<ContainerConfig, ConfigError> {
        let mut builder = ContainerConfigBuilder::new().verbose(self.debug);
        if let Some(path) = &self.config {
            builder = builder.config_file(path)?;
        }
        Ok(builder.build())
    }
}

fn init_logging(config: &ContainerConfig) {
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.log_filter()),
    )
    .init();
}

async fn run(cli: Cli, config: ContainerConfig) -> Result<(), Box<dyn Error>> {
    let container = ServiceContainer::new(config);
    let service = container.create_query_service();
    log::debug!("using {}", container.config().smi.smi_command);

    let mut out = std::io::stdout();
    if let Some(fields) = &cli.query_apu {
        let boards = service.query_fields(fields, cli.format, &mut out).await?;
        log::debug!("{} boards written", boards);
    } else if cli.query {
        service.echo_detail(cli.detail_scope(), &mut out).await?;
    } else if cli.list_apus {
        service.list_boards(&mut out).await?;
    } else if cli.chip_count {
        service.chip_count(&mut out).await?;
    } else if cli.chip_list {
        service.chip_list(&mut out).await?;
    } else if cli.help_query_apu {
        service.help_fields(&mut out).await?;
    } else {
        service.echo_summary(&mut out).await?;
    }
    out.flush()?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match cli.container_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };
    init_logging(&config);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::debug!("query failed: {:?}", e);
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_scoped_detail_query() {
        let cli = Cli::try_parse_from(["lynxi-smi-pro", "-q", "-i", "1", "-c", "2"]).unwrap();
        assert_eq!(cli.detail_scope(), DetailScope::chip(1, 2));
    }

    #[test]
    fn test_chip_requires_board() {
        assert!(Cli::try_parse_from(["lynxi-smi-pro", "-q", "-c", "2"]).is_err());
    }

    #[test]
    fn test_negative_index_rejected() {
        assert!(Cli::try_parse_from(["lynxi-smi-pro", "-q", "-i", "-1"]).is_err());
    }

    #[test]
    fn test_debug_flag_enables_verbose_logging() {
        let cli = Cli::try_parse_from(["lynxi-smi-pro", "--debug", "-L"]).unwrap();
        let config = cli.container_config().unwrap();
        assert!(config.verbose);
        assert_eq!(config.log_filter(), "debug");

        let cli = Cli::try_parse_from(["lynxi-smi-pro", "-L"]).unwrap();
        assert_eq!(cli.container_config().unwrap().log_filter(), "warn");
    }

    #[test]
    fn test_modes_are_exclusive() {
        assert!(Cli::try_parse_from(["lynxi-smi-pro", "-L", "--chip-count"]).is_err());
    }

    #[test]
    fn test_query_apu_format() {
        let cli = Cli::try_parse_from([
            "lynxi-smi-pro",
            "--query-apu",
            "name,fan.speed",
            "--format",
            "json",
        ])
        .unwrap();
        assert_eq!(cli.query_apu.as_deref(), Some("name,fan.speed"));
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.detail_scope(), DetailScope::all());
    }
}
