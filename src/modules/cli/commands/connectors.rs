//! Connectors command implementation

use clap::Args;
use retailscope_core::{ConnectorMetadata, RetailscopeError};
use retailscope_runtime::ConnectorRegistry;

/// Connectors command arguments
#[derive(Args, Debug)]
pub struct ConnectorsCommand {
    /// Print the full metadata as JSON
    #[arg(long)]
    pub json: bool,
}

impl ConnectorsCommand {
    /// Execute the connectors command
    pub fn execute(&self) -> Result<(), RetailscopeError> {
        let connectors = ConnectorRegistry::with_builtins().list();
        if self.json {
            println!("{}", serde_json::to_string_pretty(&connectors)?);
        } else {
            print!("{}", Self::render(&connectors));
        }
        Ok(())
    }

    fn render(connectors: &[ConnectorMetadata]) -> String {
        let width = connectors.iter().map(|c| c.name.len()).max().unwrap_or(0);
        let mut out = String::new();
        for connector in connectors {
            let status = if connector.available { "" } else { " (not built)" };
            out.push_str(&format!(
                "{:<width$}  {} v{}{}\n",
                connector.name,
                connector.display_name,
                connector.version,
                status,
                width = width
            ));
        }
        out
    }
}
