//! Root dashboard configuration

use serde::{Deserialize, Serialize};

use super::{ConnectionConfig, PoolConfig, ServerConfig};

/// Root configuration: the data sources a dashboard process should open
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Name of the dashboard deployment
    pub name: String,

    /// Id of the data source to make default after startup
    #[serde(default, rename = "default", skip_serializing_if = "Option::is_none")]
    pub default_source: Option<String>,

    /// Configured data sources, in declaration order
    #[serde(default)]
    pub data_sources: Vec<ConnectionConfig>,

    /// Server configuration (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server: Option<ServerConfig>,
}

impl DashboardConfig {
    /// Create a new config with no data sources
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_source: None,
            data_sources: Vec::new(),
            server: None,
        }
    }

    /// Append a data source
    pub fn with_source(mut self, source: ConnectionConfig) -> Self {
        self.data_sources.push(source);
        self
    }

    /// Find a data source by id
    pub fn find_source(&self, id: &str) -> Option<&ConnectionConfig> {
        self.data_sources.iter().find(|s| s.id == id)
    }

    /// Get the server port, defaulting to 8080
    pub fn port(&self) -> u16 {
        self.server.as_ref().map(|s| s.port()).unwrap_or(8080)
    }

    /// Pool defaults for SQL data sources
    pub fn pool(&self) -> PoolConfig {
        self.server
            .as_ref()
            .and_then(|s| s.pool.clone())
            .unwrap_or_default()
    }

    /// Apply a CLI port override
    pub fn with_port_override(mut self, port: Option<u16>) -> Self {
        if let Some(port) = port {
            self.server.get_or_insert_with(ServerConfig::default).port = Some(port);
        }
        self
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self::new("retailscope")
    }
}
