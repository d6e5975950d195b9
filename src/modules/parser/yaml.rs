//! YAML configuration parser

use retailscope_core::{ConnectionConfig, DashboardConfig, RetailscopeError, ServerConfig};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

use crate::env::EnvSubstitutor;

/// YAML parser for Retailscope configuration files
pub struct YamlParser;

/// File schema with data sources keyed by id.
///
/// The list form (`data_sources: [{ id: ..., type: ... }]`) deserializes straight
/// into [`DashboardConfig`]; this map form is what hand-written files use.
#[derive(Debug, Deserialize)]
struct FileConfig {
    name: String,

    #[serde(default)]
    default: Option<String>,

    #[serde(default)]
    data_sources: serde_yaml::Mapping,

    #[serde(default)]
    server: Option<ServerConfig>,
}

#[derive(Debug, Deserialize)]
struct FileSource {
    #[serde(rename = "type")]
    connector_type: String,

    #[serde(default)]
    name: Option<String>,

    #[serde(default)]
    description: Option<String>,

    #[serde(default)]
    fallback: Option<String>,

    #[serde(default)]
    timeout_secs: Option<u64>,

    #[serde(default)]
    options: Option<serde_yaml::Value>,

    /// Backend options written inline next to `type`
    #[serde(flatten)]
    inline: BTreeMap<String, serde_yaml::Value>,
}

impl YamlParser {
    /// Parse a YAML string into a DashboardConfig
    pub fn parse(content: &str) -> Result<DashboardConfig, RetailscopeError> {
        let substituted = EnvSubstitutor::new().substitute(content)?;
        Self::parse_raw(&substituted)
    }

    /// Parse a YAML string without environment variable substitution
    pub fn parse_raw(content: &str) -> Result<DashboardConfig, RetailscopeError> {
        if let Ok(config) = serde_yaml::from_str::<DashboardConfig>(content) {
            return Ok(config);
        }

        let file = serde_yaml::from_str::<FileConfig>(content)
            .map_err(|e| RetailscopeError::Config(format!("YAML parse error: {}", e)))?;
        file_to_config(file)
    }
}

fn file_to_config(file: FileConfig) -> Result<DashboardConfig, RetailscopeError> {
    let mut data_sources = Vec::with_capacity(file.data_sources.len());

    for (key, value) in file.data_sources {
        let id = yaml_key_to_string(&key).ok_or_else(|| {
            RetailscopeError::Config(format!("Data source key must be a string, got {:?}", key))
        })?;

        let source: FileSource = serde_yaml::from_value(value).map_err(|e| {
            RetailscopeError::Config(format!("Data source '{}': {}", id, e))
        })?;

        let mut options = match source.options {
            None => Map::new(),
            Some(raw) => match yaml_to_json(&id, raw)? {
                Value::Object(map) => map,
                Value::Null => Map::new(),
                other => {
                    return Err(RetailscopeError::Config(format!(
                        "Data source '{}': options must be a mapping, got {}",
                        id, other
                    )))
                }
            },
        };
        for (key, raw) in source.inline {
            options.entry(key).or_insert(yaml_to_json(&id, raw)?);
        }

        data_sources.push(ConnectionConfig {
            id,
            name: source.name,
            connector_type: source.connector_type,
            description: source.description,
            fallback: source.fallback,
            timeout_secs: source.timeout_secs,
            options,
        });
    }

    Ok(DashboardConfig {
        name: file.name,
        default_source: file.default,
        data_sources,
        server: file.server,
    })
}

fn yaml_to_json(id: &str, value: serde_yaml::Value) -> Result<Value, RetailscopeError> {
    serde_json::to_value(value).map_err(|e| {
        RetailscopeError::Config(format!("Data source '{}': unsupported option value: {}", id, e))
    })
}

fn yaml_key_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_config() {
        let yaml = r#"
name: minimal
data_sources: []
"#;
        let config = YamlParser::parse_raw(yaml).unwrap();
        assert_eq!(config.name, "minimal");
        assert!(config.data_sources.is_empty());
        assert!(config.default_source.is_none());
    }

    #[test]
    fn test_parse_list_form() {
        let yaml = r#"
name: list-form
default: m1
data_sources:
  - id: m1
    type: memory
    name: Mock Data
"#;
        let config = YamlParser::parse_raw(yaml).unwrap();
        assert_eq!(config.data_sources[0].id, "m1");
        assert_eq!(config.data_sources[0].name.as_deref(), Some("Mock Data"));
    }

    #[test]
    fn test_parse_map_form_keeps_order_and_options() {
        let yaml = r#"
name: full
default: warehouse
data_sources:
  warehouse:
    type: postgres
    name: Warehouse
    fallback: default-memory
    timeout_secs: 10
    options:
      url: "postgres://localhost:5432/retail"
      pool:
        max_connections: 4
  partner-api:
    type: rest-api
    base_url: "https://partner.example.com/api"
    auth:
      type: bearer
      token: abc
server:
  port: 3000
"#;
        let config = YamlParser::parse_raw(yaml).unwrap();
        assert_eq!(config.data_sources.len(), 2);

        let warehouse = &config.data_sources[0];
        assert_eq!(warehouse.id, "warehouse");
        assert_eq!(warehouse.fallback.as_deref(), Some("default-memory"));
        assert_eq!(warehouse.timeout_secs, Some(10));
        assert_eq!(warehouse.options["pool"]["max_connections"], json!(4));

        let api = &config.data_sources[1];
        assert_eq!(api.connector_type, "rest-api");
        assert_eq!(api.options["base_url"], json!("https://partner.example.com/api"));
        assert_eq!(api.options["auth"]["type"], json!("bearer"));

        assert_eq!(config.port(), 3000);
    }

    #[test]
    fn test_parse_rejects_scalar_options() {
        let yaml = r#"
name: broken
data_sources:
  a:
    type: csv
    options: "not a map"
"#;
        let err = YamlParser::parse_raw(yaml).unwrap_err();
        assert!(err.to_string().contains("options must be a mapping"));
    }

    #[test]
    fn test_parse_invalid_yaml() {
        let yaml = "invalid: yaml: content: [";
        assert!(YamlParser::parse(yaml).is_err());
    }
}
