//! HTTP request handlers for the Retailscope server
//!
//! Query execution (with fallback), dashboard panels, and data-source
//! management endpoints.

mod datasources;
mod query;

pub use datasources::DataSourceHandler;
pub use query::{QueryHandler, NATIVE_QUERY};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use retailscope_core::RetailscopeError;
use retailscope_types::runtime::ErrorBody;
use tracing::{error, warn};

/// Error returned by non-query endpoints: `{ code, error }` with a mapped status
pub struct ApiError(pub RetailscopeError);

impl From<RetailscopeError> for ApiError {
    fn from(e: RetailscopeError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let e = self.0;
        if e.is_error() {
            error!("{}", e);
        } else {
            warn!("{}", e);
        }
        let body = ErrorBody {
            code: e.code().to_string(),
            error: e.sanitized_message(),
        };
        (status_for(&e), Json(body)).into_response()
    }
}

/// HTTP status for an error
pub(crate) fn status_for(e: &RetailscopeError) -> StatusCode {
    StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}
