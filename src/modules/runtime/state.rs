//! Shared runtime application state (HTTP handlers)

use std::sync::Arc;

use crate::connectors::DataSourceManager;
use crate::dashboard::DashboardService;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<DataSourceManager>,
    pub dashboard: DashboardService,
}

impl AppState {
    pub fn new(manager: Arc<DataSourceManager>) -> Self {
        Self {
            dashboard: DashboardService::new(manager.clone()),
            manager,
        }
    }
}
