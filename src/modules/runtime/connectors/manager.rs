//! Data source manager: owns every active connector instance

use parking_lot::Mutex;
use retailscope_core::{
    ConnectionConfig, ConnectorMetadata, Result, RetailscopeError, DEFAULT_MEMORY_ID,
};
use retailscope_types::{
    Capabilities, ConnectionTest, DataSourceSchema, QueryRequest, QueryResult, TableInfo,
    TableSchema,
};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::memory::{MemoryConnector, MOCK_DATA_LABEL};
use super::registry::{ConnectorFactory, ConnectorRegistry};
use super::traits::Connector;
use crate::fallback::FallbackPolicy;

/// A connected data source
#[derive(Clone)]
pub struct DataSourceEntry {
    pub config: ConnectionConfig,
    pub connector: Arc<dyn Connector>,
}

impl DataSourceEntry {
    /// Label used for results: configured name, else the connector's display name
    pub fn label(&self) -> String {
        self.config.label_or(&self.connector.metadata().display_name)
    }
}

/// Listing entry for a data source
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSourceInfo {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub connector_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub connected: bool,
    pub is_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    pub capabilities: Capabilities,
}

#[derive(Default)]
pub(crate) struct ManagerState {
    pub(crate) sources: HashMap<String, DataSourceEntry>,
    pub(crate) default_id: Option<String>,
    /// Used when a failing source names no fallback of its own
    pub(crate) fallback_id: Option<String>,
}

/// Manages the set of active data sources
pub struct DataSourceManager {
    registry: Arc<ConnectorRegistry>,
    pub(crate) state: RwLock<ManagerState>,
    /// Ids with an add in flight
    reserved: Mutex<HashSet<String>>,
    pub(crate) policy: FallbackPolicy,
}

/// Releases a reservation; disconnects a connector left behind by a cancelled add
struct PendingAdd<'a> {
    reserved: &'a Mutex<HashSet<String>>,
    id: String,
    connector: Option<Arc<dyn Connector>>,
}

impl Drop for PendingAdd<'_> {
    fn drop(&mut self) {
        self.reserved.lock().remove(&self.id);
        if let Some(connector) = self.connector.take() {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => {
                    debug!("Add of '{}' abandoned; disconnecting in background", self.id);
                    handle.spawn(async move { connector.disconnect().await });
                }
                Err(_) => warn!(
                    "Add of '{}' abandoned outside a runtime; connector not disconnected",
                    self.id
                ),
            }
        }
    }
}

impl DataSourceManager {
    /// Create a manager over a connector registry
    pub fn new(registry: Arc<ConnectorRegistry>) -> Self {
        Self::with_policy(registry, FallbackPolicy::default())
    }

    pub fn with_policy(registry: Arc<ConnectorRegistry>, policy: FallbackPolicy) -> Self {
        Self {
            registry,
            state: RwLock::new(ManagerState::default()),
            reserved: Mutex::new(HashSet::new()),
            policy,
        }
    }

    /// Add the built-in `default-memory` source and make it default and fallback.
    ///
    /// Needs no external backend. Calling it again is a no-op.
    pub async fn initialize(&self) -> Result<()> {
        if self.contains(DEFAULT_MEMORY_ID).await {
            return Ok(());
        }

        let config = ConnectionConfig::new(DEFAULT_MEMORY_ID, "memory")
            .with_name(MOCK_DATA_LABEL)
            .with_description("Built-in mock retail data");
        let connector: Arc<dyn Connector> = Arc::new(MemoryConnector::new());
        connector.connect(&config).await?;

        let mut state = self.state.write().await;
        state.sources.insert(
            DEFAULT_MEMORY_ID.to_string(),
            DataSourceEntry { config, connector },
        );
        state
            .default_id
            .get_or_insert_with(|| DEFAULT_MEMORY_ID.to_string());
        state
            .fallback_id
            .get_or_insert_with(|| DEFAULT_MEMORY_ID.to_string());

        info!("Data source manager initialized with '{}'", DEFAULT_MEMORY_ID);
        Ok(())
    }

    /// Create, connect and test a data source, then make it available.
    ///
    /// Nothing is inserted unless the connection test passes.
    pub async fn add_data_source(&self, config: ConnectionConfig) -> Result<()> {
        let id = config.id.clone();

        let mut pending = {
            let state = self.state.read().await;
            let mut reserved = self.reserved.lock();
            if state.sources.contains_key(&id) || !reserved.insert(id.clone()) {
                return Err(RetailscopeError::DuplicateDataSource(id));
            }
            PendingAdd {
                reserved: &self.reserved,
                id: id.clone(),
                connector: None,
            }
        };

        let connector = self.registry.create(&config)?;
        pending.connector = Some(connector.clone());

        if let Err(e) = connector.connect(&config).await {
            warn!("Data source '{}' failed to connect: {}", id, e);
            pending.connector = None;
            connector.disconnect().await;
            return Err(e);
        }

        let test = connector.test_connection().await;
        if !test.success {
            warn!("Data source '{}' failed its connection test: {}", id, test.message);
            pending.connector = None;
            connector.disconnect().await;
            return Err(RetailscopeError::connection_failed(
                format!("Connection test failed for data source '{}'", id),
                &config,
                test.message,
            ));
        }

        {
            let mut state = self.state.write().await;
            if state.sources.contains_key(&id) {
                drop(state);
                pending.connector = None;
                connector.disconnect().await;
                return Err(RetailscopeError::DuplicateDataSource(id));
            }
            info!(
                "Added data source '{}' ({})",
                id,
                connector.connector_type()
            );
            state
                .sources
                .insert(id.clone(), DataSourceEntry { config, connector });
        }

        pending.connector = None;
        Ok(())
    }

    /// Add several data sources concurrently; results are in input order
    pub async fn add_data_sources(
        &self,
        configs: Vec<ConnectionConfig>,
    ) -> Vec<(String, Result<()>)> {
        let ids: Vec<String> = configs.iter().map(|c| c.id.clone()).collect();
        let results =
            futures::future::join_all(configs.into_iter().map(|c| self.add_data_source(c))).await;
        ids.into_iter().zip(results).collect()
    }

    /// Remove and disconnect a data source
    pub async fn remove_data_source(&self, id: &str) -> Result<()> {
        let entry = {
            let mut state = self.state.write().await;
            if !state.sources.contains_key(id) {
                return Err(not_found(id, &state));
            }
            if state.default_id.as_deref() == Some(id) {
                return Err(RetailscopeError::CannotRemoveDefault(id.to_string()));
            }
            if state.fallback_id.as_deref() == Some(id) {
                state.fallback_id = None;
            }
            state.sources.remove(id)
        };

        if let Some(entry) = entry {
            entry.connector.disconnect().await;
            info!("Removed data source '{}'", id);
        }
        Ok(())
    }

    /// Resolve an id (or the default) to its entry
    pub(crate) async fn entry(&self, id: Option<&str>) -> Result<DataSourceEntry> {
        let state = self.state.read().await;
        let id = match id.or(state.default_id.as_deref()) {
            Some(id) => id,
            None => return Err(not_found("default", &state)),
        };
        state
            .sources
            .get(id)
            .cloned()
            .ok_or_else(|| not_found(id, &state))
    }

    /// Get a connected connector by id, or the default one
    pub async fn get_connector(&self, id: Option<&str>) -> Result<Arc<dyn Connector>> {
        let entry = self.entry(id).await?;
        if !entry.connector.is_connected() {
            return Err(RetailscopeError::connection(format!(
                "Data source '{}' is not connected",
                entry.config.id
            )));
        }
        Ok(entry.connector)
    }

    /// Make an existing data source the default
    pub async fn set_default_data_source(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.sources.contains_key(id) {
            return Err(not_found(id, &state));
        }
        state.default_id = Some(id.to_string());
        info!("Default data source set to '{}'", id);
        Ok(())
    }

    pub async fn default_data_source_id(&self) -> Option<String> {
        self.state.read().await.default_id.clone()
    }

    /// Manager-wide fallback id
    pub async fn fallback_data_source_id(&self) -> Option<String> {
        self.state.read().await.fallback_id.clone()
    }

    /// Set the manager-wide fallback
    pub async fn set_fallback_data_source(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.sources.contains_key(id) {
            return Err(not_found(id, &state));
        }
        state.fallback_id = Some(id.to_string());
        Ok(())
    }

    /// Run a query against a data source (the default when `id` is `None`)
    pub async fn query(&self, id: Option<&str>, request: &QueryRequest) -> Result<QueryResult> {
        let connector = self.get_connector(id).await?;
        connector.query(request).await
    }

    pub async fn get_schema(&self, id: Option<&str>) -> Result<DataSourceSchema> {
        self.get_connector(id).await?.get_schema().await
    }

    pub async fn get_tables(&self, id: Option<&str>) -> Result<Vec<TableInfo>> {
        self.get_connector(id).await?.get_tables().await
    }

    pub async fn get_table_schema(&self, id: Option<&str>, table: &str) -> Result<TableSchema> {
        self.get_connector(id).await?.get_table_schema(table).await
    }

    /// Run the connection test of a registered data source
    pub async fn test_data_source(&self, id: &str) -> Result<ConnectionTest> {
        let entry = self.entry(Some(id)).await?;
        Ok(entry.connector.test_connection().await)
    }

    /// Run connection tests on all data sources in parallel
    pub async fn test_all(&self) -> HashMap<String, ConnectionTest> {
        use futures::stream::{self, StreamExt};

        let entries: Vec<(String, Arc<dyn Connector>)> = {
            let state = self.state.read().await;
            state
                .sources
                .iter()
                .map(|(id, entry)| (id.clone(), entry.connector.clone()))
                .collect()
        };

        stream::iter(entries)
            .map(|(id, connector)| async move { (id, connector.test_connection().await) })
            .buffer_unordered(16)
            .collect()
            .await
    }

    /// Describe every data source, sorted by id
    pub async fn data_sources(&self) -> Vec<DataSourceInfo> {
        let state = self.state.read().await;
        let mut infos: Vec<DataSourceInfo> = state
            .sources
            .iter()
            .map(|(id, entry)| DataSourceInfo {
                id: id.clone(),
                name: entry.label(),
                connector_type: entry.connector.connector_type().to_string(),
                description: entry.config.description.clone(),
                connected: entry.connector.is_connected(),
                is_default: state.default_id.as_deref() == Some(id.as_str()),
                fallback: entry.config.fallback.clone(),
                capabilities: entry.connector.capabilities(),
            })
            .collect();
        infos.sort_by(|a, b| a.id.cmp(&b.id));
        infos
    }

    /// Check if a data source exists
    pub async fn contains(&self, id: &str) -> bool {
        self.state.read().await.sources.contains_key(id)
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.sources.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Register a connector type on the underlying registry
    pub fn register_connector_type(
        &self,
        connector_type: &str,
        factory: ConnectorFactory,
        metadata: ConnectorMetadata,
    ) {
        self.registry.register(connector_type, factory, metadata);
    }

    /// Metadata of every registered connector type
    pub fn available_connector_types(&self) -> Vec<ConnectorMetadata> {
        self.registry.list()
    }

    /// Build an unconnected connector without adding it
    pub fn create_connector(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connector>> {
        self.registry.create(config)
    }

    pub fn registry(&self) -> &Arc<ConnectorRegistry> {
        &self.registry
    }

    /// Disconnect every data source concurrently and clear the manager
    pub async fn shutdown(&self) {
        let entries: Vec<(String, DataSourceEntry)> = {
            let mut state = self.state.write().await;
            state.default_id = None;
            state.fallback_id = None;
            state.sources.drain().collect()
        };

        if entries.is_empty() {
            return;
        }

        info!("Disconnecting {} data sources...", entries.len());
        futures::future::join_all(entries.into_iter().map(|(id, entry)| async move {
            entry.connector.disconnect().await;
            debug!("Disconnected data source '{}'", id);
        }))
        .await;
    }
}

fn not_found(id: &str, state: &ManagerState) -> RetailscopeError {
    let mut available: Vec<String> = state.sources.keys().cloned().collect();
    available.sort();
    RetailscopeError::DataSourceNotFound {
        id: id.to_string(),
        available,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::testing::StubConnector;
    use retailscope_types::QueryName;
    use std::time::Duration;

    type MakeStub = fn() -> StubConnector;

    fn stub(key: &'static str, make: MakeStub) -> (&'static str, MakeStub) {
        (key, make)
    }

    fn manager_with(stubs: Vec<(&'static str, MakeStub)>) -> DataSourceManager {
        let registry = Arc::new(ConnectorRegistry::with_builtins());
        for (key, make) in stubs {
            registry.register(
                key,
                Arc::new(move |_: &ConnectionConfig| Arc::new(make()) as Arc<dyn Connector>),
                ConnectorMetadata::new(key, key),
            );
        }
        DataSourceManager::new(registry)
    }

    fn healthy() -> StubConnector {
        StubConnector::new("Healthy")
    }

    fn unhealthy() -> StubConnector {
        StubConnector::new("Unhealthy").failing_test()
    }

    fn refusing() -> StubConnector {
        StubConnector::new("Refusing").failing_connect()
    }

    #[tokio::test]
    async fn test_empty_manager() {
        let manager = DataSourceManager::new(Arc::new(ConnectorRegistry::new()));
        assert!(manager.is_empty().await);
        assert!(manager.default_data_source_id().await.is_none());
        let err = manager.get_connector(None).await.err().unwrap();
        assert_eq!(err.code(), "DATASOURCE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_initialize_without_external_dependencies() {
        // Empty registry: the built-in source must not depend on it
        let manager = DataSourceManager::new(Arc::new(ConnectorRegistry::new()));
        manager.initialize().await.unwrap();
        manager.initialize().await.unwrap();

        assert_eq!(manager.len().await, 1);
        let connector = manager.get_connector(None).await.unwrap();
        assert!(connector.is_connected());
        assert_eq!(
            manager.default_data_source_id().await.as_deref(),
            Some(DEFAULT_MEMORY_ID)
        );
        assert_eq!(
            manager.fallback_data_source_id().await.as_deref(),
            Some(DEFAULT_MEMORY_ID)
        );
    }

    #[tokio::test]
    async fn test_add_and_query() {
        let manager = manager_with(vec![stub("stub", healthy)]);
        manager.initialize().await.unwrap();
        manager
            .add_data_source(ConnectionConfig::new("s1", "stub"))
            .await
            .unwrap();

        let result = manager
            .query(Some("s1"), &QueryName::Kpis.into())
            .await
            .unwrap();
        assert_eq!(result.source(), Some("Healthy"));
        assert_eq!(manager.len().await, 2);
    }

    #[tokio::test]
    async fn test_add_duplicate_id() {
        let manager = manager_with(vec![stub("stub", healthy)]);
        manager.initialize().await.unwrap();

        let err = manager
            .add_data_source(ConnectionConfig::new(DEFAULT_MEMORY_ID, "stub"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_DATASOURCE");
    }

    #[tokio::test]
    async fn test_failed_connection_test_leaves_map_unchanged() {
        let manager = manager_with(vec![stub("bad", unhealthy), stub("refusing", refusing)]);
        manager.initialize().await.unwrap();
        let before = manager.len().await;

        let err = manager
            .add_data_source(ConnectionConfig::new("b1", "bad"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONNECTION_ERROR");

        let err = manager
            .add_data_source(ConnectionConfig::new("r1", "refusing"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CONNECTION_ERROR");

        assert_eq!(manager.len().await, before);
        assert!(!manager.contains("b1").await);
        assert!(manager
            .add_data_source(ConnectionConfig::new("b1", "memory"))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_unknown_connector_type() {
        let manager = manager_with(vec![]);
        let err = manager
            .add_data_source(ConnectionConfig::new("x", "oracle"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_CONNECTOR_TYPE");
        // Reservation released
        let err = manager
            .add_data_source(ConnectionConfig::new("x", "oracle"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "UNKNOWN_CONNECTOR_TYPE");
    }

    #[tokio::test]
    async fn test_concurrent_adds_for_one_id() {
        fn slow() -> StubConnector {
            StubConnector::new("Slow").slow_connect(Duration::from_millis(50))
        }
        let manager = manager_with(vec![stub("slow", slow)]);

        let (a, b) = tokio::join!(
            manager.add_data_source(ConnectionConfig::new("s", "slow")),
            manager.add_data_source(ConnectionConfig::new("s", "slow")),
        );
        let codes: Vec<Option<&str>> = [&a, &b]
            .iter()
            .map(|r| r.as_ref().err().map(|e| e.code()))
            .collect();
        assert!(codes.contains(&None));
        assert!(codes.contains(&Some("DUPLICATE_DATASOURCE")));
        assert_eq!(manager.len().await, 1);
    }

    #[tokio::test]
    async fn test_cancelled_add_releases_reservation() {
        fn stalled() -> StubConnector {
            StubConnector::new("Stalled").slow_connect(Duration::from_secs(60))
        }

        let manager = manager_with(vec![stub("stalled", stalled), stub("stub", healthy)]);
        let cancelled = tokio::time::timeout(
            Duration::from_millis(20),
            manager.add_data_source(ConnectionConfig::new("s", "stalled")),
        )
        .await;
        assert!(cancelled.is_err());
        assert!(!manager.contains("s").await);

        // The id is free again
        manager
            .add_data_source(ConnectionConfig::new("s", "stub"))
            .await
            .unwrap();
        assert!(manager.contains("s").await);
    }

    #[tokio::test]
    async fn test_add_cancelled_after_connect_disconnects() {
        use crate::connectors::testing::StubCounters;
        use std::sync::atomic::Ordering;

        let counters = Arc::new(StubCounters::default());
        let registry = Arc::new(ConnectorRegistry::new());
        let shared = counters.clone();
        registry.register(
            "slow-test",
            Arc::new(move |_: &ConnectionConfig| {
                Arc::new(
                    StubConnector::new("Slow")
                        .slow_test(Duration::from_secs(60))
                        .with_counters(shared.clone()),
                ) as Arc<dyn Connector>
            }),
            ConnectorMetadata::new("slow-test", "Slow"),
        );
        let manager = DataSourceManager::new(registry);

        let cancelled = tokio::time::timeout(
            Duration::from_millis(50),
            manager.add_data_source(ConnectionConfig::new("s", "slow-test")),
        )
        .await;
        assert!(cancelled.is_err());
        assert_eq!(counters.connects.load(Ordering::SeqCst), 1);

        // Disconnect runs on a spawned task
        for _ in 0..50 {
            if counters.disconnects.load(Ordering::SeqCst) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(counters.disconnects.load(Ordering::SeqCst), 1);
        assert!(!manager.contains("s").await);
    }

    #[tokio::test]
    async fn test_remove_default_fails() {
        let manager = manager_with(vec![]);
        manager.initialize().await.unwrap();

        let err = manager
            .remove_data_source(DEFAULT_MEMORY_ID)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "CANNOT_REMOVE_DEFAULT");
        assert_eq!(manager.len().await, 1);
        assert!(manager.get_connector(None).await.is_ok());
    }

    #[tokio::test]
    async fn test_remove_disconnects() {
        let manager = manager_with(vec![]);
        manager.initialize().await.unwrap();
        manager
            .add_data_source(ConnectionConfig::new("m2", "memory"))
            .await
            .unwrap();
        let connector = manager.get_connector(Some("m2")).await.unwrap();

        manager.remove_data_source("m2").await.unwrap();
        assert!(!connector.is_connected());

        let err = manager.remove_data_source("m2").await.unwrap_err();
        assert_eq!(err.code(), "DATASOURCE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_set_default() {
        let manager = manager_with(vec![stub("stub", healthy)]);
        manager.initialize().await.unwrap();
        manager
            .add_data_source(ConnectionConfig::new("s1", "stub"))
            .await
            .unwrap();

        manager.set_default_data_source("s1").await.unwrap();
        assert_eq!(manager.default_data_source_id().await.as_deref(), Some("s1"));
        let result = manager.query(None, &QueryName::Kpis.into()).await.unwrap();
        assert_eq!(result.source(), Some("Healthy"));

        let err = manager.set_default_data_source("missing").await.unwrap_err();
        match err {
            RetailscopeError::DataSourceNotFound { id, available } => {
                assert_eq!(id, "missing");
                assert_eq!(available, vec![DEFAULT_MEMORY_ID.to_string(), "s1".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(manager.default_data_source_id().await.as_deref(), Some("s1"));

        // The old default can now be removed
        manager.remove_data_source(DEFAULT_MEMORY_ID).await.unwrap();
        assert!(manager.fallback_data_source_id().await.is_none());
    }

    #[tokio::test]
    async fn test_data_sources_listing() {
        let manager = manager_with(vec![stub("stub", healthy)]);
        manager.initialize().await.unwrap();
        manager
            .add_data_source(ConnectionConfig::new("s1", "stub").with_fallback(DEFAULT_MEMORY_ID))
            .await
            .unwrap();

        let infos = manager.data_sources().await;
        assert_eq!(infos.len(), 2);
        assert_eq!(infos[0].id, DEFAULT_MEMORY_ID);
        assert_eq!(infos[0].name, MOCK_DATA_LABEL);
        assert!(infos[0].is_default);
        assert_eq!(infos[1].name, "Stub");
        assert_eq!(infos[1].fallback.as_deref(), Some(DEFAULT_MEMORY_ID));
        assert!(infos[1].connected);
    }

    #[tokio::test]
    async fn test_test_all() {
        let manager = manager_with(vec![stub("stub", healthy)]);
        manager.initialize().await.unwrap();
        manager
            .add_data_source(ConnectionConfig::new("s1", "stub"))
            .await
            .unwrap();

        let results = manager.test_all().await;
        assert_eq!(results.len(), 2);
        assert!(results.values().all(|t| t.success));
        assert!(manager.test_data_source("s1").await.unwrap().success);
        assert!(manager.test_data_source("nope").await.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_is_idempotent() {
        let manager = manager_with(vec![stub("stub", healthy)]);
        manager.initialize().await.unwrap();
        manager
            .add_data_source(ConnectionConfig::new("s1", "stub"))
            .await
            .unwrap();
        let connectors = vec![
            manager.get_connector(None).await.unwrap(),
            manager.get_connector(Some("s1")).await.unwrap(),
        ];

        manager.shutdown().await;
        assert!(manager.is_empty().await);
        assert!(connectors.iter().all(|c| !c.is_connected()));
        assert!(manager.default_data_source_id().await.is_none());

        manager.shutdown().await;
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_end_to_end() {
        let registry = Arc::new(ConnectorRegistry::new());
        registry.register(
            "memory",
            Arc::new(|_: &ConnectionConfig| Arc::new(MemoryConnector::new()) as Arc<dyn Connector>),
            MemoryConnector::describe(),
        );
        let manager = DataSourceManager::new(registry);
        manager
            .add_data_source(ConnectionConfig::new("m1", "memory"))
            .await
            .unwrap();
        manager.set_default_data_source("m1").await.unwrap();

        let result = manager
            .query(None, &QueryRequest::named(QueryName::Kpis, Some(7)))
            .await
            .unwrap();
        let meta = result.metadata.unwrap();
        assert_eq!(meta.source, MOCK_DATA_LABEL);
        assert_eq!(meta.total_records, result.data.len());
    }
}
