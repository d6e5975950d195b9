//! Per-instance data source configuration

use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

use crate::error::{Result, RetailscopeError};

/// Id of the built-in in-memory data source created by manager initialization
pub const DEFAULT_MEMORY_ID: &str = "default-memory";

/// Option keys whose values are masked when a config is rendered for errors/logs
const SECRET_KEYS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "api_key",
    "apikey",
    "credentials",
    "authorization",
];

/// `scheme://user:password@` userinfo in connection URLs
static URL_PASSWORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?P<prefix>[A-Za-z][A-Za-z0-9+.-]*://[^:/@\s]+:)[^@\s]+@").unwrap());

/// Configuration of one data source instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Unique id across all active data sources
    pub id: String,

    /// Display label; also reported as the `source` of query results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Registered connector type (case-insensitive)
    #[serde(rename = "type")]
    pub connector_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Data source to fail over to when this one cannot answer a query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,

    /// Time bound handed to the backend client (connect/acquire/request)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,

    /// Backend-specific settings, validated by the connector's config schema
    #[serde(default)]
    pub options: Map<String, Value>,
}

impl ConnectionConfig {
    /// Create a config with the given id and connector type
    pub fn new(id: impl Into<String>, connector_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            connector_type: connector_type.into(),
            description: None,
            fallback: None,
            timeout_secs: None,
            options: Map::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    /// Set a backend-specific option
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Registry key for the connector type
    pub fn type_key(&self) -> String {
        self.connector_type.trim().to_lowercase()
    }

    /// Label for results, falling back to the given default
    pub fn label_or(&self, default: &str) -> String {
        self.name.clone().unwrap_or_else(|| default.to_string())
    }

    /// Backend client timeout, if configured
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Deserialize `options` into a connector's typed options struct
    pub fn options_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.options.clone())).map_err(|e| {
            RetailscopeError::Config(format!(
                "Invalid options for data source '{}' ({}): {}",
                self.id, self.connector_type, e
            ))
        })
    }

    /// Render the config as JSON with credentials masked
    pub fn redacted(&self) -> Value {
        let mut value = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(options) = value.get_mut("options") {
            redact_value(options);
        }
        value
    }
}

fn is_secret_key(key: &str) -> bool {
    let key = key.to_lowercase();
    SECRET_KEYS.iter().any(|secret| key.contains(secret))
}

fn redact_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                if is_secret_key(key) && !inner.is_null() {
                    *inner = Value::String("***".to_string());
                } else {
                    redact_value(inner);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_value),
        Value::String(s) => {
            if URL_PASSWORD.is_match(s.as_str()) {
                let masked = URL_PASSWORD
                    .replace_all(s.as_str(), "${prefix}***@")
                    .into_owned();
                *s = masked;
            }
        }
        _ => {}
    }
}
