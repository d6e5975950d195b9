//! Retailscope CLI
//!
//! Command-line interface for the Retailscope dashboard data layer.

use clap::Parser;
use retailscope_cli::{Cli, Commands};
use retailscope_core::RetailscopeError;
use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), RetailscopeError> {
    let cli = Cli::parse();
    let config_path = cli.config_path().to_string();

    // Initialize logging; RUST_LOG wins over the default level
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    // Logs go to stderr so command output on stdout stays parseable
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    match cli.command {
        Commands::Run(cmd) => {
            cmd.execute(&config_path).await?;
        }
        Commands::Connectors(cmd) => {
            cmd.execute()?;
        }
        Commands::Test(cmd) => {
            cmd.execute(&config_path).await?;
        }
        Commands::Query(cmd) => {
            cmd.execute(&config_path).await?;
        }
    }

    Ok(())
}
