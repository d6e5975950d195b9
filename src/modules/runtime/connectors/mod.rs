//! Data-source connectors for Retailscope
//!
//! Every backend implements [`Connector`]. The [`ConnectorRegistry`] builds
//! connectors by type and the [`DataSourceManager`] owns the live ones.
//! PostgreSQL, MySQL and MongoDB are behind the `postgres`, `mysql` and
//! `mongo` cargo features.

mod csv;
mod lifecycle;
mod manager;
mod memory;
mod registry;
mod rest;
mod traits;

#[cfg(any(feature = "postgres", feature = "mysql"))]
mod sql;

#[cfg(feature = "mongo")]
mod mongodb;
#[cfg(feature = "mysql")]
mod mysql;
#[cfg(feature = "postgres")]
mod postgres;

#[cfg(test)]
pub(crate) mod testing;

pub use self::csv::CsvConnector;
pub use lifecycle::{ConnectionState, Lifecycle};
pub use manager::{DataSourceEntry, DataSourceInfo, DataSourceManager};
pub use memory::{MemoryConnector, MOCK_DATA_LABEL};
pub use registry::{ConnectorFactory, ConnectorRegistry};
pub use rest::RestApiConnector;
pub use traits::Connector;

#[cfg(feature = "mongo")]
pub use self::mongodb::MongoDbConnector;
#[cfg(feature = "mysql")]
pub use mysql::MySqlConnector;
#[cfg(feature = "postgres")]
pub use postgres::PostgresConnector;
