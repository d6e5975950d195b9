//! Runtime for Retailscope
//!
//! This crate provides the data-source connectors, the connector registry and
//! data source manager, fallback between sources, the retail dataset behind
//! the mock and file connectors, and the HTTP server.

pub mod connectors;
pub mod dashboard;
pub mod dataset;
pub mod fallback;
pub mod handlers;
pub mod server;
pub mod state;

pub use connectors::{Connector, ConnectorRegistry, DataSourceManager};
pub use dashboard::{DashboardData, DashboardService};
pub use fallback::FallbackPolicy;
pub use handlers::{DataSourceHandler, QueryHandler};
pub use server::{apply_pool_defaults, Runtime};
