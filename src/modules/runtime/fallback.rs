//! Failover from a failing data source to its fallback

use retailscope_core::Result;
use retailscope_types::{QueryRequest, QueryResult};
use tracing::{info, warn};

use crate::connectors::DataSourceManager;

/// How the manager reacts when a query fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackPolicy {
    /// Make the fallback the default after the default source fails
    pub promote_on_failure: bool,
}

impl Default for FallbackPolicy {
    fn default() -> Self {
        Self {
            promote_on_failure: true,
        }
    }
}

impl FallbackPolicy {
    /// Retry on the fallback but keep the default untouched
    pub fn retry_only() -> Self {
        Self {
            promote_on_failure: false,
        }
    }
}

impl DataSourceManager {
    /// Run a query, retrying once on the fallback data source if it fails.
    ///
    /// The fallback is the failing source's own `fallback`, else the
    /// manager-wide one. Rows served by the fallback carry
    /// `metadata.fallback = true` and the fallback's label as `source`. When
    /// no distinct fallback exists, or it fails too, the primary error is
    /// returned. An unknown `id` is reported as is.
    pub async fn query_with_fallback(
        &self,
        id: Option<&str>,
        request: &QueryRequest,
    ) -> Result<QueryResult> {
        let primary = self.entry(id).await?;
        let primary_id = primary.config.id.clone();

        let primary_err = match self.query(Some(&primary_id), request).await {
            Ok(result) => return Ok(result),
            Err(e) => e,
        };

        let (fallback_id, was_default) = {
            let state = self.state.read().await;
            let fallback_id = primary
                .config
                .fallback
                .clone()
                .or_else(|| state.fallback_id.clone());
            (fallback_id, state.default_id.as_deref() == Some(primary_id.as_str()))
        };

        let Some(fallback_id) = fallback_id.filter(|f| f != &primary_id) else {
            return Err(primary_err);
        };

        warn!(
            "Query '{}' failed on '{}' ({}); retrying on fallback '{}'",
            request.label(),
            primary_id,
            primary_err,
            fallback_id
        );

        let fallback = match self.entry(Some(&fallback_id)).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Fallback '{}' unavailable: {}", fallback_id, e);
                return Err(primary_err);
            }
        };

        match self.query(Some(&fallback_id), request).await {
            Ok(result) => {
                if was_default && self.policy.promote_on_failure {
                    let mut state = self.state.write().await;
                    // Only swap if nobody changed the default meanwhile
                    if state.default_id.as_deref() == Some(primary_id.as_str())
                        && state.sources.contains_key(&fallback_id)
                    {
                        state.default_id = Some(fallback_id.clone());
                        info!(
                            "Default data source switched from '{}' to fallback '{}'",
                            primary_id, fallback_id
                        );
                    }
                }
                let label = result
                    .source()
                    .map(str::to_string)
                    .unwrap_or_else(|| fallback.label());
                Ok(result.into_fallback(label))
            }
            Err(fallback_err) => {
                warn!(
                    "Fallback '{}' also failed: {}",
                    fallback_id, fallback_err
                );
                Err(primary_err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::testing::StubConnector;
    use crate::connectors::{Connector, ConnectorRegistry};
    use retailscope_core::{ConnectionConfig, ConnectorMetadata, DEFAULT_MEMORY_ID};
    use retailscope_types::{QueryName, Record};
    use serde_json::json;
    use std::sync::Arc;

    fn zero_kpis() -> Vec<Record> {
        let row: Record = [
            ("totalRevenue".to_string(), json!(0)),
            ("transactionCount".to_string(), json!(0)),
            ("avgBasketSize".to_string(), json!(0)),
        ]
        .into_iter()
        .collect();
        vec![row]
    }

    fn failing() -> StubConnector {
        StubConnector::new("Primary").failing_query()
    }

    fn backup() -> StubConnector {
        StubConnector::new("Backup").with_rows(zero_kpis())
    }

    fn manager(policy: FallbackPolicy) -> DataSourceManager {
        let registry = Arc::new(ConnectorRegistry::with_builtins());
        registry.register(
            "failing",
            Arc::new(|_: &ConnectionConfig| Arc::new(failing()) as Arc<dyn Connector>),
            ConnectorMetadata::new("failing", "Failing"),
        );
        registry.register(
            "backup",
            Arc::new(|_: &ConnectionConfig| Arc::new(backup()) as Arc<dyn Connector>),
            ConnectorMetadata::new("backup", "Backup"),
        );
        DataSourceManager::with_policy(registry, policy)
    }

    fn kpis_30() -> QueryRequest {
        QueryRequest::named(QueryName::Kpis, Some(30))
    }

    #[tokio::test]
    async fn test_fallback_serves_zero_kpi_row() {
        let manager = manager(FallbackPolicy::default());
        manager.initialize().await.unwrap();
        manager
            .add_data_source(ConnectionConfig::new("backup", "backup"))
            .await
            .unwrap();
        manager
            .add_data_source(ConnectionConfig::new("primary", "failing").with_fallback("backup"))
            .await
            .unwrap();
        manager.set_default_data_source("primary").await.unwrap();

        let result = manager.query_with_fallback(None, &kpis_30()).await.unwrap();
        assert_eq!(result.first().unwrap()["totalRevenue"], json!(0));
        assert_eq!(result.source(), Some("Backup"));
        assert!(result.is_fallback());

        // Default promoted to the fallback
        assert_eq!(
            manager.default_data_source_id().await.as_deref(),
            Some("backup")
        );
    }

    #[tokio::test]
    async fn test_global_fallback_is_default_memory() {
        let manager = manager(FallbackPolicy::retry_only());
        manager.initialize().await.unwrap();
        manager
            .add_data_source(ConnectionConfig::new("primary", "failing"))
            .await
            .unwrap();
        manager.set_default_data_source("primary").await.unwrap();

        let result = manager.query_with_fallback(None, &kpis_30()).await.unwrap();
        assert_eq!(result.source(), Some("Mock Data"));
        assert!(result.is_fallback());
        assert_eq!(
            manager.default_data_source_id().await.as_deref(),
            Some("primary")
        );
    }

    #[tokio::test]
    async fn test_non_default_failure_does_not_promote() {
        let manager = manager(FallbackPolicy::default());
        manager.initialize().await.unwrap();
        manager
            .add_data_source(ConnectionConfig::new("primary", "failing"))
            .await
            .unwrap();

        let result = manager
            .query_with_fallback(Some("primary"), &kpis_30())
            .await
            .unwrap();
        assert!(result.is_fallback());
        assert_eq!(
            manager.default_data_source_id().await.as_deref(),
            Some(DEFAULT_MEMORY_ID)
        );
    }

    #[tokio::test]
    async fn test_fallback_is_tried_once() {
        use crate::connectors::testing::StubCounters;
        use std::sync::atomic::Ordering;

        let primary = Arc::new(StubConnector::new("Primary").failing_query());
        let backup_counters = Arc::new(StubCounters::default());

        let registry = Arc::new(ConnectorRegistry::new());
        let shared = primary.clone();
        registry.register(
            "shared",
            Arc::new(move |_: &ConnectionConfig| shared.clone() as Arc<dyn Connector>),
            ConnectorMetadata::new("shared", "Shared"),
        );
        let counters = backup_counters.clone();
        registry.register(
            "down",
            Arc::new(move |_: &ConnectionConfig| {
                Arc::new(
                    StubConnector::new("Down")
                        .failing_query()
                        .with_counters(counters.clone()),
                ) as Arc<dyn Connector>
            }),
            ConnectorMetadata::new("down", "Down"),
        );
        let manager = DataSourceManager::with_policy(registry, FallbackPolicy::retry_only());
        manager
            .add_data_source(ConnectionConfig::new("down", "down"))
            .await
            .unwrap();
        manager
            .add_data_source(ConnectionConfig::new("primary", "shared").with_fallback("down"))
            .await
            .unwrap();
        manager.set_default_data_source("primary").await.unwrap();

        // Both fail: one attempt each, primary error wins
        let err = manager.query_with_fallback(None, &kpis_30()).await.unwrap_err();
        assert_eq!(err.query_failure(), Some(retailscope_core::QueryFailure::Unreachable));
        assert_eq!(primary.counters.queries.load(Ordering::SeqCst), 1);
        assert_eq!(backup_counters.queries.load(Ordering::SeqCst), 1);

        // Primary recovers: fallback is not consulted
        primary.set_query_failure(false);
        let result = manager.query_with_fallback(None, &kpis_30()).await.unwrap();
        assert!(!result.is_fallback());
        assert_eq!(result.source(), Some("Primary"));
        assert_eq!(primary.counters.queries.load(Ordering::SeqCst), 2);
        assert_eq!(backup_counters.queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_success_is_not_marked_fallback() {
        let manager = manager(FallbackPolicy::default());
        manager.initialize().await.unwrap();
        let result = manager.query_with_fallback(None, &kpis_30()).await.unwrap();
        assert!(!result.is_fallback());
        assert_eq!(result.source(), Some("Mock Data"));
    }

    #[tokio::test]
    async fn test_no_distinct_fallback_returns_primary_error() {
        let manager = manager(FallbackPolicy::default());
        manager
            .add_data_source(ConnectionConfig::new("primary", "failing"))
            .await
            .unwrap();

        let err = manager
            .query_with_fallback(Some("primary"), &kpis_30())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "QUERY_ERROR");

        let err = manager
            .query_with_fallback(Some("missing"), &kpis_30())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "DATASOURCE_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_failing_fallback_returns_primary_error() {
        let manager = manager(FallbackPolicy::default());
        manager
            .add_data_source(ConnectionConfig::new("other", "failing"))
            .await
            .unwrap();
        manager
            .add_data_source(ConnectionConfig::new("primary", "failing").with_fallback("other"))
            .await
            .unwrap();

        let err = manager
            .query_with_fallback(Some("primary"), &kpis_30())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("stub backend down"));
    }
}
