//! Server and connection pool settings

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Connection pool settings for the SQL connectors
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Maximum number of connections in the pool (default: 10)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_connections: Option<u32>,

    /// Minimum number of idle connections to keep (default: 0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_connections: Option<u32>,

    /// Connection acquire timeout in seconds (default: 30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquire_timeout_secs: Option<u64>,

    /// Idle connection timeout in seconds (default: 30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_secs: Option<u64>,

    /// Maximum lifetime of a connection in seconds (default: 1800)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_lifetime_secs: Option<u64>,
}

impl PoolConfig {
    pub fn max_connections(&self) -> u32 {
        self.max_connections.unwrap_or(10)
    }

    pub fn min_connections(&self) -> u32 {
        self.min_connections.unwrap_or(0)
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs.unwrap_or(30))
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs.unwrap_or(30))
    }

    pub fn max_lifetime(&self) -> Duration {
        Duration::from_secs(self.max_lifetime_secs.unwrap_or(1800))
    }

    /// Fill unset fields from `base`; values set on `self` win
    pub fn or(&self, base: &PoolConfig) -> PoolConfig {
        PoolConfig {
            max_connections: self.max_connections.or(base.max_connections),
            min_connections: self.min_connections.or(base.min_connections),
            acquire_timeout_secs: self.acquire_timeout_secs.or(base.acquire_timeout_secs),
            idle_timeout_secs: self.idle_timeout_secs.or(base.idle_timeout_secs),
            max_lifetime_secs: self.max_lifetime_secs.or(base.max_lifetime_secs),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port to listen on (default: 8080)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Bind address (default: 0.0.0.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    /// Log filter directive, e.g. `info` or `retailscope_runtime=debug`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_level: Option<String>,

    /// Request timeout in seconds (default: 30)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,

    /// Pool defaults for SQL data sources
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool: Option<PoolConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: Some(8080),
            host: None,
            log_level: None,
            request_timeout_secs: None,
            pool: None,
        }
    }
}

impl ServerConfig {
    pub fn port(&self) -> u16 {
        self.port.unwrap_or(8080)
    }

    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or("0.0.0.0")
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(30))
    }
}
