//! Logical query vocabulary shared between dashboard consumers and connectors

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Window used when a query that takes `days` is issued without one
pub const DEFAULT_DAYS: u32 = 30;

/// Longest window a query may ask for (about ten years)
pub const MAX_DAYS: u32 = 3660;

/// Bound a requested window to `1..=MAX_DAYS`
pub fn clamp_days(days: u32) -> u32 {
    days.clamp(1, MAX_DAYS)
}

/// Canned queries every dashboard-capable connector understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryName {
    /// Headline numbers: revenue, transaction count, basket size, top product
    Kpis,
    /// Most recent transactions
    Transactions,
    /// Per-day transaction count and revenue
    Trends,
    /// Best-selling products by sales
    TopProducts,
}

impl fmt::Display for QueryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "kpis" | "kpi" => Ok(QueryName::Kpis),
            "transactions" => Ok(QueryName::Transactions),
            "trends" => Ok(QueryName::Trends),
            "top-products" | "top_products" => Ok(QueryName::TopProducts),
            _ => Err(format!("Unknown query: {}", s)),
        }
    }
}

impl QueryName {
    /// Returns every logical query name
    pub fn all() -> &'static [QueryName] {
        &[
            QueryName::Kpis,
            QueryName::Transactions,
            QueryName::Trends,
            QueryName::TopProducts,
        ]
    }

    /// Wire name of the query
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryName::Kpis => "kpis",
            QueryName::Transactions => "transactions",
            QueryName::Trends => "trends",
            QueryName::TopProducts => "top-products",
        }
    }

    /// Returns true if the query is windowed by a number of days
    pub fn takes_days(&self) -> bool {
        !matches!(self, QueryName::Transactions)
    }
}

/// A request handed to a connector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QueryRequest {
    /// One of the canned dashboard queries
    Named {
        name: QueryName,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        days: Option<u32>,
    },
    /// A backend-native statement (SQL text, command document, table name or path)
    Native { statement: String },
}

impl QueryRequest {
    /// Build a canned query request
    pub fn named(name: QueryName, days: Option<u32>) -> Self {
        QueryRequest::Named { name, days }
    }

    /// Build a backend-native request
    pub fn native(statement: impl Into<String>) -> Self {
        QueryRequest::Native {
            statement: statement.into(),
        }
    }

    /// Effective day window, clamped to `1..=MAX_DAYS` (only meaningful for named queries)
    pub fn days(&self) -> u32 {
        match self {
            QueryRequest::Named { days, .. } => clamp_days(days.unwrap_or(DEFAULT_DAYS)),
            QueryRequest::Native { .. } => DEFAULT_DAYS,
        }
    }

    /// Short label used in logs and errors
    pub fn label(&self) -> String {
        match self {
            QueryRequest::Named { name, .. } => name.to_string(),
            QueryRequest::Native { .. } => "native".to_string(),
        }
    }
}

impl From<QueryName> for QueryRequest {
    fn from(name: QueryName) -> Self {
        QueryRequest::named(name, None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_name_from_str() {
        assert_eq!(QueryName::from_str("kpis").unwrap(), QueryName::Kpis);
        assert_eq!(QueryName::from_str("KPIS").unwrap(), QueryName::Kpis);
        assert_eq!(
            QueryName::from_str("top-products").unwrap(),
            QueryName::TopProducts
        );
        assert_eq!(
            QueryName::from_str("top_products").unwrap(),
            QueryName::TopProducts
        );
        assert!(QueryName::from_str("revenue-by-region").is_err());
    }

    #[test]
    fn test_query_name_display_round_trips() {
        for name in QueryName::all() {
            assert_eq!(QueryName::from_str(&name.to_string()).unwrap(), *name);
        }
    }

    #[test]
    fn test_request_days_default() {
        assert_eq!(QueryRequest::named(QueryName::Trends, None).days(), 30);
        assert_eq!(QueryRequest::named(QueryName::Trends, Some(7)).days(), 7);
        assert!(!QueryName::Transactions.takes_days());
    }

    #[test]
    fn test_request_days_clamped() {
        assert_eq!(
            QueryRequest::named(QueryName::Kpis, Some(u32::MAX)).days(),
            MAX_DAYS
        );
        assert_eq!(QueryRequest::named(QueryName::Kpis, Some(0)).days(), 1);
    }

    #[test]
    fn test_request_serde() {
        let request = QueryRequest::named(QueryName::TopProducts, Some(7));
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"kind":"named","name":"top-products","days":7}"#);

        let parsed: QueryRequest =
            serde_json::from_str(r#"{"kind":"native","statement":"SELECT 1"}"#).unwrap();
        assert_eq!(parsed, QueryRequest::native("SELECT 1"));
    }
}
