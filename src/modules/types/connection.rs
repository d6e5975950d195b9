//! Connection health and capability descriptions

use serde::{Deserialize, Serialize};

use crate::query::QueryName;

/// Outcome of a connector's cheap round-trip check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ConnectionTest {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
            details: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

/// What a connector can do beyond connect/query/disconnect
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Capabilities {
    /// Canned dashboard queries this connector answers
    pub queries: Vec<QueryName>,
    /// Accepts backend-native statements
    pub native_queries: bool,
    /// Supports schema/table introspection
    pub introspection: bool,
    /// Backend may change under the connector (remote store)
    pub remote: bool,
}

impl Capabilities {
    /// Returns true if the named query is supported
    pub fn supports(&self, name: QueryName) -> bool {
        self.queries.contains(&name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_test_constructors() {
        let ok = ConnectionTest::ok("pong");
        assert!(ok.success);
        assert!(ok.details.is_none());

        let failed =
            ConnectionTest::failed("refused").with_details(serde_json::json!({"port": 5432}));
        assert!(!failed.success);
        assert_eq!(failed.details.unwrap()["port"], 5432);
    }

    #[test]
    fn test_capabilities_supports() {
        let caps = Capabilities {
            queries: vec![QueryName::Kpis],
            native_queries: false,
            introspection: true,
            remote: false,
        };
        assert!(caps.supports(QueryName::Kpis));
        assert!(!caps.supports(QueryName::Trends));
    }
}
