//! Error types for Retailscope

use std::fmt;
use thiserror::Error;

/// Why a connector query failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryFailure {
    /// The backend could not be reached (network, pool closed, timeout)
    Unreachable,
    /// The request itself is invalid for this backend
    Malformed,
    /// The backend received the request and reported an error
    Backend,
}

impl fmt::Display for QueryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryFailure::Unreachable => write!(f, "backend unreachable"),
            QueryFailure::Malformed => write!(f, "malformed query"),
            QueryFailure::Backend => write!(f, "backend error"),
        }
    }
}

/// Main error type for Retailscope operations
#[derive(Error, Debug)]
pub enum RetailscopeError {
    /// No connector is registered under the requested type
    #[error("Unknown connector type: {requested} (available: {})", .available.join(", "))]
    UnknownConnectorType {
        requested: String,
        available: Vec<String>,
    },

    /// A data source with this id already exists (or is being added)
    #[error("Data source with id '{0}' already exists")]
    DuplicateDataSource(String),

    /// No data source with this id
    #[error("Data source '{id}' not found")]
    DataSourceNotFound { id: String, available: Vec<String> },

    /// The default data source cannot be removed
    #[error("Cannot remove the default data source '{0}'")]
    CannotRemoveDefault(String),

    /// Connect or connection test failure
    #[error("Connection error: {message}")]
    Connection {
        message: String,
        /// Attempted configuration with secrets masked
        config: Option<serde_json::Value>,
        /// Underlying cause as reported by the backend client
        cause: Option<String>,
    },

    /// Failure while executing a query
    #[error("Query failed ({kind}): {message}")]
    Query { kind: QueryFailure, message: String },

    /// The connector does not implement this logical query
    #[error("Query '{query}' is not supported by the {connector} connector")]
    UnsupportedQuery { connector: String, query: String },

    /// Configuration file parsing error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Environment variable not found
    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    /// HTTP server error
    #[error("Server error: {0}")]
    Server(String),

    /// File system error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RetailscopeError {
    /// Connection error without config or cause attached
    pub fn connection(message: impl Into<String>) -> Self {
        RetailscopeError::Connection {
            message: message.into(),
            config: None,
            cause: None,
        }
    }

    /// Connection error carrying the (redacted) attempted config and the cause
    pub fn connection_failed(
        message: impl Into<String>,
        config: &crate::ConnectionConfig,
        cause: impl fmt::Display,
    ) -> Self {
        RetailscopeError::Connection {
            message: message.into(),
            config: Some(config.redacted()),
            cause: Some(cause.to_string()),
        }
    }

    pub fn unreachable(message: impl Into<String>) -> Self {
        RetailscopeError::Query {
            kind: QueryFailure::Unreachable,
            message: message.into(),
        }
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        RetailscopeError::Query {
            kind: QueryFailure::Malformed,
            message: message.into(),
        }
    }

    pub fn backend(message: impl Into<String>) -> Self {
        RetailscopeError::Query {
            kind: QueryFailure::Backend,
            message: message.into(),
        }
    }

    pub fn unsupported(connector: impl Into<String>, query: impl Into<String>) -> Self {
        RetailscopeError::UnsupportedQuery {
            connector: connector.into(),
            query: query.into(),
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            RetailscopeError::UnknownConnectorType { .. } => "UNKNOWN_CONNECTOR_TYPE",
            RetailscopeError::DuplicateDataSource(_) => "DUPLICATE_DATASOURCE",
            RetailscopeError::DataSourceNotFound { .. } => "DATASOURCE_NOT_FOUND",
            RetailscopeError::CannotRemoveDefault(_) => "CANNOT_REMOVE_DEFAULT",
            RetailscopeError::Connection { .. } => "CONNECTION_ERROR",
            RetailscopeError::Query { .. } => "QUERY_ERROR",
            RetailscopeError::UnsupportedQuery { .. } => "UNSUPPORTED_QUERY",
            RetailscopeError::Config(_) => "CONFIG_ERROR",
            RetailscopeError::Validation(_) => "VALIDATION_ERROR",
            RetailscopeError::EnvVarNotFound(_) => "ENV_VAR_NOT_FOUND",
            RetailscopeError::Server(_) => "SERVER_ERROR",
            RetailscopeError::Io(_) => "IO_ERROR",
            RetailscopeError::Json(_) => "JSON_ERROR",
            RetailscopeError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Query failure kind, if this is a query error
    pub fn query_failure(&self) -> Option<QueryFailure> {
        match self {
            RetailscopeError::Query { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// Returns true if this error should be logged at error level
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            RetailscopeError::Connection { .. }
                | RetailscopeError::Server(_)
                | RetailscopeError::Internal(_)
                | RetailscopeError::Query {
                    kind: QueryFailure::Unreachable | QueryFailure::Backend,
                    ..
                }
        )
    }

    /// Returns true if this error is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }

    /// Returns the appropriate HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            RetailscopeError::DataSourceNotFound { .. } => 404,
            RetailscopeError::DuplicateDataSource(_) | RetailscopeError::CannotRemoveDefault(_) => {
                409
            }
            RetailscopeError::UnknownConnectorType { .. }
            | RetailscopeError::UnsupportedQuery { .. }
            | RetailscopeError::Config(_)
            | RetailscopeError::Validation(_)
            | RetailscopeError::Query {
                kind: QueryFailure::Malformed,
                ..
            } => 400,
            RetailscopeError::Connection { .. } | RetailscopeError::Query { .. } => 502,
            _ => 500,
        }
    }

    /// Sanitize the error message to avoid leaking sensitive information
    pub fn sanitized_message(&self) -> String {
        match self {
            // Don't expose connection details
            RetailscopeError::Connection { .. } => "Data source connection error".to_string(),
            RetailscopeError::Query {
                kind: QueryFailure::Unreachable,
                ..
            } => "Data source unreachable".to_string(),
            RetailscopeError::Query {
                kind: QueryFailure::Backend,
                ..
            } => "Data source reported an error".to_string(),

            // Don't expose internal details
            RetailscopeError::Internal(_) | RetailscopeError::Io(_) => {
                "Internal server error".to_string()
            }

            // Safe to expose
            _ => self.to_string(),
        }
    }
}

/// Result type alias using RetailscopeError
pub type Result<T> = std::result::Result<T, RetailscopeError>;
