//! In-memory connector: the mock retail dataset plus arbitrary tables

use async_trait::async_trait;
use parking_lot::RwLock;
use retailscope_core::{ConnectionConfig, ConnectorMetadata, Result, RetailscopeError};
use retailscope_types::{
    Capabilities, ConnectionTest, FieldType, QueryName, QueryRequest, QueryResult, Record,
    TableInfo, TableSchema,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

use super::lifecycle::Lifecycle;
use super::traits::Connector;
use crate::dataset::{self, mock, ColumnMap, Transaction};

/// Label reported by the memory connector when the config names none
pub const MOCK_DATA_LABEL: &str = "Mock Data";

/// Table the canned queries read from
pub const TRANSACTIONS_TABLE: &str = "transactions";

#[derive(Debug, Deserialize)]
#[serde(default)]
struct MemoryOptions {
    /// Seed the `transactions` table with the mock dataset
    mock: bool,
    /// Extra tables loaded at connect
    tables: BTreeMap<String, Vec<Record>>,
}

impl Default for MemoryOptions {
    fn default() -> Self {
        Self {
            mock: true,
            tables: BTreeMap::new(),
        }
    }
}

#[derive(Default)]
struct MemoryStore {
    label: String,
    tables: BTreeMap<String, Vec<Record>>,
    /// Parsed view of the transactions table
    transactions: Vec<Transaction>,
}

impl MemoryStore {
    fn refresh_transactions(&mut self) {
        self.transactions = match self.tables.get(TRANSACTIONS_TABLE) {
            Some(rows) => {
                dataset::aggregate::transactions_from_records(rows, &ColumnMap::default())
            }
            None => Vec::new(),
        };
    }
}

/// Connector over data held in process memory
pub struct MemoryConnector {
    lifecycle: Lifecycle,
    store: RwLock<MemoryStore>,
}

impl MemoryConnector {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            store: RwLock::new(MemoryStore::default()),
        }
    }

    /// Registry metadata for the `memory` type
    pub fn describe() -> ConnectorMetadata {
        ConnectorMetadata::new("memory", "In-Memory Data")
            .with_description("Built-in mock retail dataset and in-memory tables")
            .with_icon("memory-stick")
            .optional(
                "mock",
                FieldType::Boolean,
                "Seed the transactions table with mock data (default true)",
            )
            .optional("tables", FieldType::Object, "Tables to load, keyed by name")
    }

    /// Replace the rows of a table
    pub fn insert(&self, table: impl Into<String>, rows: Vec<Record>) {
        let table = table.into();
        let mut store = self.store.write();
        let refresh = table == TRANSACTIONS_TABLE;
        store.tables.insert(table, rows);
        if refresh {
            store.refresh_transactions();
        }
    }

    fn ensure_connected(&self) -> Result<()> {
        if self.lifecycle.is_connected() {
            Ok(())
        } else {
            Err(RetailscopeError::connection("Memory data source is not connected"))
        }
    }
}

impl Default for MemoryConnector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<()> {
        let Some(attempt) = self.lifecycle.begin_connect().await else {
            return Ok(());
        };

        let options: MemoryOptions = config
            .options_as()
            .map_err(|e| RetailscopeError::connection_failed("Invalid memory options", config, e))?;

        let mut tables = options.tables;
        if options.mock && !tables.contains_key(TRANSACTIONS_TABLE) {
            let today = chrono::Local::now().date_naive();
            let rows = mock::transactions(today).iter().map(Transaction::to_record).collect();
            tables.insert(TRANSACTIONS_TABLE.to_string(), rows);
        }

        {
            let mut store = self.store.write();
            store.label = config.label_or(MOCK_DATA_LABEL);
            store.tables = tables;
            store.refresh_transactions();
            debug!(
                "Memory data source '{}' loaded {} tables",
                config.id,
                store.tables.len()
            );
        }

        attempt.succeed();
        Ok(())
    }

    async fn test_connection(&self) -> ConnectionTest {
        if !self.lifecycle.is_connected() {
            return ConnectionTest::failed("Memory data source is not connected");
        }
        let store = self.store.read();
        ConnectionTest::ok("In-memory data available").with_details(serde_json::json!({
            "tables": store.tables.len(),
            "transactions": store.transactions.len(),
        }))
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        self.ensure_connected()?;
        let started = Instant::now();
        let store = self.store.read();

        let rows = match request {
            QueryRequest::Named { name, .. } => {
                dataset::answer(*name, &store.transactions, request.days())
            }
            QueryRequest::Native { statement } => {
                let table = statement.trim();
                store.tables.get(table).cloned().ok_or_else(|| {
                    RetailscopeError::malformed(format!("Table '{}' not found", table))
                })?
            }
        };

        Ok(QueryResult::new(
            rows,
            store.label.clone(),
            started.elapsed().as_millis() as u64,
        ))
    }

    async fn get_tables(&self) -> Result<Vec<TableInfo>> {
        self.ensure_connected()?;
        let store = self.store.read();
        Ok(store
            .tables
            .iter()
            .map(|(name, rows)| TableInfo {
                name: name.clone(),
                row_count: Some(rows.len() as u64),
            })
            .collect())
    }

    async fn get_table_schema(&self, table: &str) -> Result<TableSchema> {
        self.ensure_connected()?;
        let store = self.store.read();
        let rows = store
            .tables
            .get(table)
            .ok_or_else(|| RetailscopeError::malformed(format!("Table '{}' not found", table)))?;
        Ok(TableSchema::infer(table, rows))
    }

    async fn disconnect(&self) {
        let Some(_attempt) = self.lifecycle.begin_disconnect().await else {
            return;
        };
        let mut store = self.store.write();
        store.tables.clear();
        store.transactions.clear();
    }

    fn is_connected(&self) -> bool {
        self.lifecycle.is_connected()
    }

    fn metadata(&self) -> ConnectorMetadata {
        Self::describe()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            queries: QueryName::all().to_vec(),
            native_queries: true,
            introspection: true,
            remote: false,
        }
    }

    fn connector_type(&self) -> &'static str {
        "memory"
    }
}
