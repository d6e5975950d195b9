//! Connector trait definition

use async_trait::async_trait;
use retailscope_core::{ConnectionConfig, ConnectorMetadata, Result};
use retailscope_types::{
    Capabilities, ConnectionTest, DataSourceSchema, QueryRequest, QueryResult, TableInfo,
    TableSchema,
};

/// Trait for data source connectors
///
/// All connectors implement this trait to provide a uniform query contract
/// across in-memory data, flat files, HTTP APIs and databases. Methods take
/// `&self`; connectors keep their session behind interior mutability so one
/// instance can be shared as `Arc<dyn Connector>`.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Establish the backend session
    ///
    /// Calling `connect` on a connected instance is a no-op. Failures are
    /// reported as `RetailscopeError::Connection` with the redacted config.
    async fn connect(&self, config: &ConnectionConfig) -> Result<()>;

    /// Cheap round-trip against the backend. Never fails, never mutates state.
    async fn test_connection(&self) -> ConnectionTest;

    /// Execute a canned or native query
    ///
    /// # Returns
    /// Normalized rows plus metadata naming this connector's label
    async fn query(&self, request: &QueryRequest) -> Result<QueryResult>;

    /// Describe every table the data source exposes
    async fn get_schema(&self) -> Result<DataSourceSchema> {
        let mut tables = Vec::new();
        for table in self.get_tables().await? {
            tables.push(self.get_table_schema(&table.name).await?);
        }
        Ok(DataSourceSchema { tables })
    }

    /// List tables (or collections, endpoints)
    async fn get_tables(&self) -> Result<Vec<TableInfo>>;

    /// Columns of a single table
    async fn get_table_schema(&self, table: &str) -> Result<TableSchema>;

    /// Release the session. Idempotent; errors are logged and swallowed.
    async fn disconnect(&self);

    /// Last known connection state
    fn is_connected(&self) -> bool;

    /// Static description of the connector type
    fn metadata(&self) -> ConnectorMetadata;

    /// What this connector supports
    fn capabilities(&self) -> Capabilities;

    /// Get the connector type name
    fn connector_type(&self) -> &'static str;
}
