//! Scriptable connector used by the registry, manager and fallback tests

use async_trait::async_trait;
use retailscope_core::{ConnectionConfig, ConnectorMetadata, Result, RetailscopeError};
use retailscope_types::{
    Capabilities, ConnectionTest, QueryName, QueryRequest, QueryResult, Record, TableInfo,
    TableSchema,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use super::lifecycle::Lifecycle;
use super::traits::Connector;

/// Counters shared between a stub and the test that built it
#[derive(Default)]
pub struct StubCounters {
    pub connects: AtomicUsize,
    pub disconnects: AtomicUsize,
    pub queries: AtomicUsize,
}

pub struct StubConnector {
    label: String,
    lifecycle: Lifecycle,
    pub counters: Arc<StubCounters>,
    fail_connect: bool,
    fail_test: bool,
    fail_query: AtomicBool,
    connect_delay: Option<Duration>,
    test_delay: Option<Duration>,
    rows: Vec<Record>,
}

impl StubConnector {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
            lifecycle: Lifecycle::new(),
            counters: Arc::new(StubCounters::default()),
            fail_connect: false,
            fail_test: false,
            fail_query: AtomicBool::new(false),
            connect_delay: None,
            test_delay: None,
            rows: Vec::new(),
        }
    }

    pub fn failing_connect(mut self) -> Self {
        self.fail_connect = true;
        self
    }

    pub fn failing_test(mut self) -> Self {
        self.fail_test = true;
        self
    }

    pub fn failing_query(self) -> Self {
        self.fail_query.store(true, Ordering::SeqCst);
        self
    }

    pub fn slow_connect(mut self, delay: Duration) -> Self {
        self.connect_delay = Some(delay);
        self
    }

    pub fn slow_test(mut self, delay: Duration) -> Self {
        self.test_delay = Some(delay);
        self
    }

    pub fn with_rows(mut self, rows: Vec<Record>) -> Self {
        self.rows = rows;
        self
    }

    pub fn with_counters(mut self, counters: Arc<StubCounters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn set_query_failure(&self, fail: bool) {
        self.fail_query.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for StubConnector {
    async fn connect(&self, _config: &ConnectionConfig) -> Result<()> {
        let Some(attempt) = self.lifecycle.begin_connect().await else {
            return Ok(());
        };
        if let Some(delay) = self.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_connect {
            return Err(RetailscopeError::connection("stub refused"));
        }
        self.counters.connects.fetch_add(1, Ordering::SeqCst);
        attempt.succeed();
        Ok(())
    }

    async fn test_connection(&self) -> ConnectionTest {
        if let Some(delay) = self.test_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_test || !self.lifecycle.is_connected() {
            ConnectionTest::failed("stub unhealthy")
        } else {
            ConnectionTest::ok("stub ok")
        }
    }

    async fn query(&self, _request: &QueryRequest) -> Result<QueryResult> {
        self.counters.queries.fetch_add(1, Ordering::SeqCst);
        if self.fail_query.load(Ordering::SeqCst) {
            return Err(RetailscopeError::unreachable("stub backend down"));
        }
        Ok(QueryResult::new(self.rows.clone(), self.label.clone(), 0))
    }

    async fn get_tables(&self) -> Result<Vec<TableInfo>> {
        Ok(vec![TableInfo {
            name: "stub".to_string(),
            row_count: Some(self.rows.len() as u64),
        }])
    }

    async fn get_table_schema(&self, table: &str) -> Result<TableSchema> {
        Ok(TableSchema::infer(table, &self.rows))
    }

    async fn disconnect(&self) {
        if self.lifecycle.begin_disconnect().await.is_some() {
            self.counters.disconnects.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_connected(&self) -> bool {
        self.lifecycle.is_connected()
    }

    fn metadata(&self) -> ConnectorMetadata {
        ConnectorMetadata::new("stub", "Stub")
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            queries: QueryName::all().to_vec(),
            native_queries: false,
            introspection: true,
            remote: false,
        }
    }

    fn connector_type(&self) -> &'static str {
        "stub"
    }
}
