//! Runtime type definitions for HTTP request/response handling

use serde::{Deserialize, Serialize};

use crate::result::{QueryMetadata, QueryResult, Record};

/// Body of `POST /query/{name}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryBody {
    /// Day window for windowed queries
    #[serde(default)]
    pub days: Option<u32>,
    /// Data source id; the default data source when absent
    #[serde(default)]
    pub data_source: Option<String>,
    /// Backend-native statement, used when the query name is `native`
    #[serde(default)]
    pub statement: Option<String>,
}

/// Query execution response
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResponse {
    /// Whether the query succeeded
    pub success: bool,
    /// Error message if the query failed
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error: String,
    /// Stable error code if the query failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Result rows
    #[serde(default)]
    pub data: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<QueryMetadata>,
    /// Set when the rows came from a fallback data source
    #[serde(default)]
    pub using_fallback: bool,
}

impl QueryResponse {
    /// Create a successful response from a query result
    pub fn success(result: QueryResult) -> Self {
        let using_fallback = result.is_fallback();
        Self {
            success: true,
            error: String::new(),
            code: None,
            data: result.data,
            metadata: result.metadata,
            using_fallback,
        }
    }

    /// Create an error response
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
            code: Some(code.into()),
            data: Vec::new(),
            metadata: None,
            using_fallback: false,
        }
    }
}

/// Generic error body for non-query endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub error: String,
}

/// Body of `PUT /datasources/default`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetDefaultBody {
    pub id: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_response_success() {
        let result = QueryResult::new(vec![], "Mock Data", 0).into_fallback("Mock Data");
        let response = QueryResponse::success(result);
        assert!(response.success);
        assert!(response.error.is_empty());
        assert!(response.using_fallback);
    }

    #[test]
    fn test_query_response_error() {
        let response = QueryResponse::error("DATASOURCE_NOT_FOUND", "Data source 'x' not found");
        assert!(!response.success);
        assert_eq!(response.code.as_deref(), Some("DATASOURCE_NOT_FOUND"));
        assert!(response.data.is_empty());
    }

    #[test]
    fn test_query_body_camel_case() {
        let body: QueryBody =
            serde_json::from_value(json!({"days": 7, "dataSource": "warehouse"})).unwrap();
        assert_eq!(body.days, Some(7));
        assert_eq!(body.data_source.as_deref(), Some("warehouse"));
        assert!(body.statement.is_none());

        let empty: QueryBody = serde_json::from_value(json!({})).unwrap();
        assert!(empty.days.is_none());
    }
}
