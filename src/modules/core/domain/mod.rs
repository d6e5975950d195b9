//! Domain models for Retailscope configuration

mod config;
mod metadata;
mod model;
mod types;

pub use config::{ConnectionConfig, DEFAULT_MEMORY_ID};
pub use metadata::{ConfigField, ConfigSchema, ConnectorMetadata};
pub use model::DashboardConfig;
pub use types::{PoolConfig, ServerConfig};
