//! Query execution handler

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use retailscope_core::RetailscopeError;
use retailscope_types::runtime::{QueryBody, QueryResponse};
use retailscope_types::{QueryName, QueryRequest, DEFAULT_DAYS};
use serde::Deserialize;
use std::str::FromStr;
use tracing::{error, info};

use super::{status_for, ApiError};
use crate::dashboard::DashboardData;
use crate::state::AppState;

/// Query name that runs the body's `statement` as is
pub const NATIVE_QUERY: &str = "native";

/// Query string of `GET /dashboard/{panel}`
#[derive(Debug, Default, Deserialize)]
pub struct PanelParams {
    pub days: Option<u32>,
    pub source: Option<String>,
}

/// Handler for query execution requests
pub struct QueryHandler;

impl QueryHandler {
    /// Handle POST /query/{query_name}
    pub async fn execute(
        State(state): State<AppState>,
        Path(query_name): Path<String>,
        body: Option<Json<QueryBody>>,
    ) -> impl IntoResponse {
        let body = body.map(|Json(body)| body).unwrap_or_default();
        info!("Executing query: {}", query_name);

        let request = match Self::request_for(&query_name, &body) {
            Ok(request) => request,
            Err(e) => {
                return (
                    status_for(&e),
                    Json(QueryResponse::error(e.code(), e.sanitized_message())),
                )
            }
        };

        match state
            .manager
            .query_with_fallback(body.data_source.as_deref(), &request)
            .await
        {
            Ok(result) => {
                info!(
                    "Query '{}' executed successfully, {} rows returned",
                    query_name,
                    result.len()
                );
                (StatusCode::OK, Json(QueryResponse::success(result)))
            }
            Err(e) => {
                error!("Query '{}' failed: {}", query_name, e);
                (
                    status_for(&e),
                    Json(QueryResponse::error(e.code(), e.sanitized_message())),
                )
            }
        }
    }

    /// Handle GET /dashboard/{panel}; never fails for a known panel
    pub async fn panel(
        State(state): State<AppState>,
        Path(panel): Path<String>,
        Query(params): Query<PanelParams>,
    ) -> Result<Json<DashboardData>, ApiError> {
        let name = QueryName::from_str(&panel).map_err(RetailscopeError::Validation)?;
        let data = state
            .dashboard
            .panel(
                params.source.as_deref(),
                name,
                params.days.unwrap_or(DEFAULT_DAYS),
            )
            .await;
        Ok(Json(data))
    }

    fn request_for(query_name: &str, body: &QueryBody) -> Result<QueryRequest, RetailscopeError> {
        if query_name.eq_ignore_ascii_case(NATIVE_QUERY) {
            return match body.statement.as_deref().map(str::trim) {
                Some(statement) if !statement.is_empty() => Ok(QueryRequest::native(statement)),
                _ => Err(RetailscopeError::Validation(
                    "A native query needs a non-empty 'statement'".to_string(),
                )),
            };
        }
        let name = QueryName::from_str(query_name).map_err(RetailscopeError::Validation)?;
        Ok(QueryRequest::named(name, body.days))
    }
}
