//! CLI commands

mod connectors;
mod query;
mod run;

pub use connectors::ConnectorsCommand;
pub use query::QueryCommand;
pub use run::RunCommand;
pub use test::TestCommand;

use clap::{Parser, Subcommand};
use retailscope_core::{DashboardConfig, RetailscopeError};
use retailscope_parser::parse_file;
use std::path::Path;
use tracing::{info, warn};

/// Configuration file used when `-f/--file` is not given
pub const DEFAULT_CONFIG_FILE: &str = "retailscope.yaml";

/// Retailscope - pluggable data sources for retail dashboards
#[derive(Parser, Debug)]
#[command(name = "retailscope")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file path (YAML)
    ///
    /// Global so it can follow the subcommand, e.g. `retailscope run -f prod.yaml`.
    #[arg(short = 'f', long = "file", global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the dashboard API server
    Run(RunCommand),

    /// List the registered connector types
    Connectors(ConnectorsCommand),

    /// Connect one configured data source and report its health
    Test(TestCommand),

    /// Run a dashboard query (with fallback) and print the result
    Query(QueryCommand),
}

impl Cli {
    /// Configuration file path
    pub fn config_path(&self) -> &str {
        &self.config
    }
}

/// Load the dashboard configuration.
///
/// A missing default file yields the built-in config (mock data only); a
/// missing file that was named explicitly is an error.
pub fn load_config(path: &str) -> Result<DashboardConfig, RetailscopeError> {
    if path == DEFAULT_CONFIG_FILE && !Path::new(path).exists() {
        warn!(
            "No {} found, starting with the built-in mock data source only",
            DEFAULT_CONFIG_FILE
        );
        return Ok(DashboardConfig::default());
    }
    info!("Loading configuration from: {}", path);
    parse_file(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_cli_parse() {
        let cli = Cli::try_parse_from(["retailscope", "run"]).unwrap();
        assert_eq!(cli.config_path(), DEFAULT_CONFIG_FILE);
        assert!(!cli.verbose);
        assert!(!cli.log_json);
    }

    #[test]
    fn test_cli_with_config_after_subcommand() {
        let cli = Cli::try_parse_from(["retailscope", "run", "-f", "custom.yaml", "--log-json"])
            .unwrap();
        assert_eq!(cli.config_path(), "custom.yaml");
        assert!(cli.log_json);
    }

    #[test]
    fn test_cli_query_and_test_args() {
        let cli = Cli::try_parse_from([
            "retailscope",
            "query",
            "trends",
            "--days",
            "7",
            "--source",
            "warehouse",
        ])
        .unwrap();
        match cli.command {
            Commands::Query(cmd) => {
                assert_eq!(cmd.name, "trends");
                assert_eq!(cmd.days, Some(7));
                assert_eq!(cmd.source.as_deref(), Some("warehouse"));
            }
            other => panic!("unexpected command: {:?}", other),
        }

        let cli = Cli::try_parse_from(["retailscope", "test", "warehouse"]).unwrap();
        assert!(matches!(cli.command, Commands::Test(ref cmd) if cmd.id == "warehouse"));

        assert!(Cli::try_parse_from(["retailscope", "test"]).is_err());
    }

    #[test]
    fn test_load_config_explicit_missing_file_fails() {
        let err = load_config("/nonexistent/retailscope-custom.yaml").unwrap_err();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
name: shop-floor
data_sources:
  sales:
    type: memory
"#
        )
        .unwrap();

        let config = load_config(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.name, "shop-floor");
        assert!(config.find_source("sales").is_some());
    }
}
