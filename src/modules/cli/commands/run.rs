//! Run command implementation

use clap::Args;
use retailscope_core::RetailscopeError;
use retailscope_runtime::Runtime;
use tracing::info;

use super::load_config;

/// Run command arguments
#[derive(Args, Debug)]
pub struct RunCommand {
    /// Override server port
    #[arg(short, long)]
    pub port: Option<u16>,
}

impl RunCommand {
    /// Execute the run command
    pub async fn execute(&self, config_path: &str) -> Result<(), RetailscopeError> {
        let config = load_config(config_path)?.with_port_override(self.port);
        info!(
            "Starting '{}' with {} configured data source(s)",
            config.name,
            config.data_sources.len()
        );

        let runtime = Runtime::new(config).await?;
        runtime.run().await?;

        Ok(())
    }
}
