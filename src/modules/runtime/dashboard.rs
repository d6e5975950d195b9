//! Dashboard queries that always produce rows
//!
//! Each call goes through [`DataSourceManager::query_with_fallback`]. If that
//! fails as well, the rows are computed from the built-in mock dataset and
//! flagged as fallback data, so a panel never renders an error page.

use retailscope_core::RetailscopeError;
use retailscope_types::{QueryName, QueryRequest, QueryResult, Record};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::connectors::{DataSourceManager, MOCK_DATA_LABEL};
use crate::dataset::{self, mock};

/// Rows for one dashboard panel
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub rows: Vec<Record>,
    /// Label of the data source that produced the rows
    pub source: String,
    pub using_fallback: bool,
    /// Sanitized error that forced the mock substitution, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DashboardData {
    fn from_result(result: QueryResult) -> Self {
        let using_fallback = result.is_fallback();
        let source = result.source().unwrap_or(MOCK_DATA_LABEL).to_string();
        Self {
            rows: result.data,
            source,
            using_fallback,
            error: None,
        }
    }

    fn substitute(name: QueryName, days: u32, error: &RetailscopeError) -> Self {
        let today = chrono::Local::now().date_naive();
        Self {
            rows: dataset::answer(name, &mock::transactions(today), days),
            source: MOCK_DATA_LABEL.to_string(),
            using_fallback: true,
            error: Some(error.sanitized_message()),
        }
    }
}

/// Panel-level queries for the dashboard UI
#[derive(Clone)]
pub struct DashboardService {
    manager: Arc<DataSourceManager>,
}

impl DashboardService {
    pub fn new(manager: Arc<DataSourceManager>) -> Self {
        Self { manager }
    }

    pub async fn kpis(&self, days: u32) -> DashboardData {
        self.panel(None, QueryName::Kpis, days).await
    }

    pub async fn transactions(&self) -> DashboardData {
        self.panel(None, QueryName::Transactions, retailscope_types::DEFAULT_DAYS)
            .await
    }

    pub async fn trends(&self, days: u32) -> DashboardData {
        self.panel(None, QueryName::Trends, days).await
    }

    pub async fn top_products(&self, days: u32) -> DashboardData {
        self.panel(None, QueryName::TopProducts, days).await
    }

    /// Any panel against a chosen data source (the default when `source` is `None`)
    pub async fn panel(&self, source: Option<&str>, name: QueryName, days: u32) -> DashboardData {
        let request = QueryRequest::named(name, Some(days));
        match self.manager.query_with_fallback(source, &request).await {
            Ok(result) => DashboardData::from_result(result),
            Err(e) => {
                warn!("Dashboard {} unavailable, showing mock data: {}", name, e);
                DashboardData::substitute(name, days, &e)
            }
        }
    }
}
