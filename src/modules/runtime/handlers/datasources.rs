//! Data source management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use retailscope_core::{ConnectionConfig, ConnectorMetadata, RetailscopeError};
use retailscope_types::runtime::SetDefaultBody;
use retailscope_types::{ConnectionTest, DataSourceSchema, TableInfo, TableSchema};
use serde_json::{json, Value};
use tracing::info;

use super::ApiError;
use crate::connectors::DataSourceInfo;
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

/// Handler for data source and connector endpoints
pub struct DataSourceHandler;

impl DataSourceHandler {
    /// GET /health
    pub async fn health(State(state): State<AppState>) -> Json<Value> {
        Json(json!({
            "status": "ok",
            "dataSources": state.manager.len().await,
            "default": state.manager.default_data_source_id().await,
        }))
    }

    /// GET /connectors
    pub async fn connectors(State(state): State<AppState>) -> Json<Vec<ConnectorMetadata>> {
        Json(state.manager.available_connector_types())
    }

    /// GET /datasources
    pub async fn list(State(state): State<AppState>) -> Json<Vec<DataSourceInfo>> {
        Json(state.manager.data_sources().await)
    }

    /// POST /datasources
    pub async fn add(
        State(state): State<AppState>,
        Json(config): Json<ConnectionConfig>,
    ) -> ApiResult<(StatusCode, Json<DataSourceInfo>)> {
        if config.id.trim().is_empty() {
            return Err(
                RetailscopeError::Validation("Data source id is required".to_string()).into(),
            );
        }
        let id = config.id.clone();
        state.manager.add_data_source(config).await?;
        info!("Data source '{}' added over HTTP", id);

        let info = state
            .manager
            .data_sources()
            .await
            .into_iter()
            .find(|info| info.id == id)
            .ok_or_else(|| {
                RetailscopeError::Internal(format!("Data source '{}' vanished after add", id))
            })?;
        Ok((StatusCode::CREATED, Json(info)))
    }

    /// DELETE /datasources/{id}
    pub async fn remove(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> ApiResult<StatusCode> {
        state.manager.remove_data_source(&id).await?;
        Ok(StatusCode::NO_CONTENT)
    }

    /// POST /datasources/{id}/test
    pub async fn test(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> ApiResult<Json<ConnectionTest>> {
        Ok(Json(state.manager.test_data_source(&id).await?))
    }

    /// PUT /datasources/default
    pub async fn set_default(
        State(state): State<AppState>,
        Json(body): Json<SetDefaultBody>,
    ) -> ApiResult<Json<Value>> {
        state.manager.set_default_data_source(&body.id).await?;
        Ok(Json(json!({ "default": body.id })))
    }

    /// GET /datasources/{id}/tables
    pub async fn tables(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> ApiResult<Json<Vec<TableInfo>>> {
        Ok(Json(state.manager.get_tables(Some(&id)).await?))
    }

    /// GET /datasources/{id}/tables/{table}
    pub async fn table_schema(
        State(state): State<AppState>,
        Path((id, table)): Path<(String, String)>,
    ) -> ApiResult<Json<TableSchema>> {
        Ok(Json(state.manager.get_table_schema(Some(&id), &table).await?))
    }

    /// GET /datasources/{id}/schema
    pub async fn schema(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> ApiResult<Json<DataSourceSchema>> {
        Ok(Json(state.manager.get_schema(Some(&id)).await?))
    }
}
