//! Normalized query result returned by every connector

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A single row: column name to value
pub type Record = HashMap<String, serde_json::Value>;

/// Backend-agnostic query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Rows in backend order
    pub data: Vec<Record>,
    /// Provenance and timing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<QueryMetadata>,
}

/// Metadata attached to a query result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMetadata {
    pub total_records: usize,
    /// Wall-clock time spent in the connector, in milliseconds
    #[serde(rename = "queryTime")]
    pub query_time_ms: u64,
    /// Human-readable label of the data source that produced the rows
    pub source: String,
    /// Set when the rows came from a fallback data source
    #[serde(default)]
    pub fallback: bool,
}

impl QueryResult {
    /// Build a result from rows, filling metadata from the row count
    pub fn new(data: Vec<Record>, source: impl Into<String>, query_time_ms: u64) -> Self {
        let total_records = data.len();
        Self {
            data,
            metadata: Some(QueryMetadata {
                total_records,
                query_time_ms,
                source: source.into(),
                fallback: false,
            }),
        }
    }

    /// Result with no rows and no metadata
    pub fn empty() -> Self {
        Self {
            data: Vec::new(),
            metadata: None,
        }
    }

    /// Source label, if metadata is present
    pub fn source(&self) -> Option<&str> {
        self.metadata.as_ref().map(|m| m.source.as_str())
    }

    /// Returns true if the rows were served by a fallback source
    pub fn is_fallback(&self) -> bool {
        self.metadata.as_ref().map(|m| m.fallback).unwrap_or(false)
    }

    /// Mark the result as coming from a fallback data source
    pub fn into_fallback(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        match self.metadata.as_mut() {
            Some(meta) => {
                meta.source = source;
                meta.fallback = true;
            }
            None => {
                self.metadata = Some(QueryMetadata {
                    total_records: self.data.len(),
                    query_time_ms: 0,
                    source,
                    fallback: true,
                });
            }
        }
        self
    }

    /// First row, if any
    pub fn first(&self) -> Option<&Record> {
        self.data.first()
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if there are no rows
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(key: &str, value: serde_json::Value) -> Record {
        let mut map = HashMap::new();
        map.insert(key.to_string(), value);
        map
    }

    #[test]
    fn test_result_new_fills_metadata() {
        let result = QueryResult::new(vec![row("a", json!(1)), row("a", json!(2))], "Mock Data", 3);
        let meta = result.metadata.as_ref().unwrap();
        assert_eq!(meta.total_records, 2);
        assert_eq!(meta.source, "Mock Data");
        assert!(!meta.fallback);
    }

    #[test]
    fn test_into_fallback() {
        let result = QueryResult::new(vec![], "Warehouse", 1).into_fallback("Mock Data");
        assert!(result.is_fallback());
        assert_eq!(result.source(), Some("Mock Data"));

        let bare = QueryResult::empty().into_fallback("Mock Data");
        assert_eq!(bare.metadata.unwrap().total_records, 0);
    }

    #[test]
    fn test_metadata_serializes_camel_case() {
        let result = QueryResult::new(vec![row("x", json!("y"))], "CSV", 12);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["metadata"]["totalRecords"], json!(1));
        assert_eq!(json["metadata"]["queryTime"], json!(12));
        assert_eq!(json["metadata"]["source"], json!("CSV"));
    }
}
