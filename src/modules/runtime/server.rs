//! HTTP server for Retailscope

use axum::{
    routing::{get, post, put},
    Router,
};
use retailscope_core::{ConnectionConfig, DashboardConfig, PoolConfig, Result, RetailscopeError};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::connectors::{ConnectorRegistry, DataSourceManager};
use crate::handlers::{DataSourceHandler, QueryHandler};
use crate::state::AppState;

/// Connector types that take the server-level pool defaults
const POOLED_TYPES: &[&str] = &["postgres", "mysql"];

/// Runtime server for Retailscope
pub struct Runtime {
    config: Arc<DashboardConfig>,
    manager: Arc<DataSourceManager>,
}

/// Copy server pool defaults into SQL sources that set no pool of their own
pub fn apply_pool_defaults(config: &DashboardConfig) -> Vec<ConnectionConfig> {
    let pool = config.pool();
    config
        .data_sources
        .iter()
        .cloned()
        .map(|mut source| {
            if POOLED_TYPES.contains(&source.type_key().as_str())
                && !source.options.contains_key("pool")
                && pool != PoolConfig::default()
            {
                if let Ok(value) = serde_json::to_value(&pool) {
                    source.options.insert("pool".to_string(), value);
                }
            }
            source
        })
        .collect()
}

impl Runtime {
    /// Build the manager for a config: built-in mock source first, then every
    /// configured source. A source that fails to connect is logged and skipped.
    pub async fn new(config: DashboardConfig) -> Result<Self> {
        Self::with_registry(config, Arc::new(ConnectorRegistry::with_builtins())).await
    }

    /// Same as [`Runtime::new`] with a caller-supplied registry
    pub async fn with_registry(
        config: DashboardConfig,
        registry: Arc<ConnectorRegistry>,
    ) -> Result<Self> {
        let manager = Arc::new(DataSourceManager::new(registry));
        manager.initialize().await?;

        let sources = apply_pool_defaults(&config);
        for (id, result) in manager.add_data_sources(sources).await {
            match result {
                Ok(()) => info!("Data source '{}' ready", id),
                Err(e) => error!("Data source '{}' unavailable, skipping: {}", id, e),
            }
        }

        if let Some(default) = &config.default_source {
            if let Err(e) = manager.set_default_data_source(default).await {
                warn!(
                    "Configured default '{}' not available, keeping '{}': {}",
                    default,
                    manager.default_data_source_id().await.unwrap_or_default(),
                    e
                );
            }
        }

        Ok(Self {
            config: Arc::new(config),
            manager,
        })
    }

    /// Build the Axum router
    pub fn build_router(&self) -> Router {
        let state = AppState::new(self.manager.clone());

        // CORS configuration
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        // Request timeout
        let timeout = TimeoutLayer::new(
            self.config
                .server
                .as_ref()
                .map(|s| s.request_timeout())
                .unwrap_or_else(|| std::time::Duration::from_secs(30)),
        );

        Router::new()
            // Query endpoints
            .route("/query/:query_name", post(QueryHandler::execute))
            .route("/dashboard/:panel", get(QueryHandler::panel))
            // Data sources
            .route(
                "/datasources",
                get(DataSourceHandler::list).post(DataSourceHandler::add),
            )
            .route("/datasources/default", put(DataSourceHandler::set_default))
            .route(
                "/datasources/:id",
                axum::routing::delete(DataSourceHandler::remove),
            )
            .route("/datasources/:id/test", post(DataSourceHandler::test))
            .route("/datasources/:id/tables", get(DataSourceHandler::tables))
            .route(
                "/datasources/:id/tables/:table",
                get(DataSourceHandler::table_schema),
            )
            .route("/datasources/:id/schema", get(DataSourceHandler::schema))
            .route("/connectors", get(DataSourceHandler::connectors))
            // Health check
            .route("/health", get(DataSourceHandler::health))
            // State
            .with_state(state)
            // Middleware
            .layer(cors)
            .layer(timeout)
            .layer(TraceLayer::new_for_http())
    }

    /// Start the server and block until a shutdown signal
    pub async fn run(&self) -> Result<()> {
        let host = self
            .config
            .server
            .as_ref()
            .map(|s| s.host().to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        let addr: SocketAddr = format!("{}:{}", host, self.config.port())
            .parse()
            .map_err(|e| RetailscopeError::Server(format!("Invalid address: {}", e)))?;

        let app = self.build_router();

        info!("Starting Retailscope server on http://{}", addr);
        info!("Dashboard: {}", self.config.name);
        let sources: Vec<String> = self
            .manager
            .data_sources()
            .await
            .into_iter()
            .map(|s| s.id)
            .collect();
        info!("Data sources: {}", sources.join(", "));
        info!(
            "Default data source: {}",
            self.manager.default_data_source_id().await.unwrap_or_default()
        );

        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RetailscopeError::Server(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, app)
            .with_graceful_shutdown(Self::shutdown_signal())
            .await
            .map_err(|e| RetailscopeError::Server(format!("Server error: {}", e)))?;

        info!("Server stopped");
        self.shutdown().await;

        Ok(())
    }

    /// Wait for shutdown signal
    async fn shutdown_signal() {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                error!("Failed to listen for CTRL+C: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    sigterm.recv().await;
                }
                Err(e) => {
                    error!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                debug!("Received CTRL+C, shutting down...");
            }
            _ = terminate => {
                debug!("Received SIGTERM, shutting down...");
            }
        }
    }

    /// Disconnect every data source
    pub async fn shutdown(&self) {
        info!("Closing data source connections...");
        self.manager.shutdown().await;
        info!("Shutdown complete");
    }

    /// Get the config
    pub fn config(&self) -> &DashboardConfig {
        &self.config
    }

    /// Get the data source manager
    pub fn manager(&self) -> &Arc<DataSourceManager> {
        &self.manager
    }
}
