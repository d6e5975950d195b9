//! Connector registry with factory pattern.
//!
//! The [`ConnectorRegistry`] maps case-insensitive type keys to connector
//! metadata and a factory that builds fresh, unconnected instances.

use parking_lot::RwLock;
use retailscope_core::{ConnectionConfig, ConnectorMetadata, Result, RetailscopeError};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::csv::CsvConnector;
use super::memory::MemoryConnector;
use super::rest::RestApiConnector;
use super::traits::Connector;

/// Factory function type for creating connectors
pub type ConnectorFactory = Arc<dyn Fn(&ConnectionConfig) -> Arc<dyn Connector> + Send + Sync>;

struct RegistryEntry {
    metadata: ConnectorMetadata,
    /// `None` for backends compiled out of this build
    factory: Option<ConnectorFactory>,
}

/// Registry of available connector types
pub struct ConnectorRegistry {
    entries: RwLock<HashMap<String, RegistryEntry>>,
}

impl ConnectorRegistry {
    /// Creates a new empty registry
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with every connector shipped in this build
    pub fn with_builtins() -> Self {
        let registry = Self::new();

        registry.register(
            "memory",
            Arc::new(|_: &ConnectionConfig| Arc::new(MemoryConnector::new()) as Arc<dyn Connector>),
            MemoryConnector::describe(),
        );
        registry.register(
            "csv",
            Arc::new(|_: &ConnectionConfig| Arc::new(CsvConnector::new()) as Arc<dyn Connector>),
            CsvConnector::describe(),
        );
        registry.register(
            "rest-api",
            Arc::new(|_: &ConnectionConfig| {
                Arc::new(RestApiConnector::new()) as Arc<dyn Connector>
            }),
            RestApiConnector::describe(),
        );

        #[cfg(feature = "postgres")]
        registry.register(
            "postgres",
            Arc::new(|_: &ConnectionConfig| {
                Arc::new(super::postgres::PostgresConnector::new()) as Arc<dyn Connector>
            }),
            super::postgres::PostgresConnector::describe(),
        );
        #[cfg(not(feature = "postgres"))]
        registry.register_unavailable(
            ConnectorMetadata::new("postgres", "PostgreSQL")
                .with_description("Built without the `postgres` feature"),
        );

        #[cfg(feature = "mysql")]
        registry.register(
            "mysql",
            Arc::new(|_: &ConnectionConfig| {
                Arc::new(super::mysql::MySqlConnector::new()) as Arc<dyn Connector>
            }),
            super::mysql::MySqlConnector::describe(),
        );
        #[cfg(not(feature = "mysql"))]
        registry.register_unavailable(
            ConnectorMetadata::new("mysql", "MySQL")
                .with_description("Built without the `mysql` feature"),
        );

        #[cfg(feature = "mongo")]
        registry.register(
            "mongodb",
            Arc::new(|_: &ConnectionConfig| {
                Arc::new(super::mongodb::MongoDbConnector::new()) as Arc<dyn Connector>
            }),
            super::mongodb::MongoDbConnector::describe(),
        );
        #[cfg(not(feature = "mongo"))]
        registry.register_unavailable(
            ConnectorMetadata::new("mongodb", "MongoDB")
                .with_description("Built without the `mongo` feature"),
        );

        registry
    }

    /// Register a connector type. A later registration for the same key replaces the earlier one.
    pub fn register(
        &self,
        connector_type: &str,
        factory: ConnectorFactory,
        mut metadata: ConnectorMetadata,
    ) {
        let key = normalize(connector_type);
        metadata.name = key.clone();

        let previous = self.entries.write().insert(
            key.clone(),
            RegistryEntry {
                metadata,
                factory: Some(factory),
            },
        );

        if previous.is_some() {
            warn!("Connector type '{}' registered twice; using the latest registration", key);
        } else {
            debug!("Registered connector type '{}'", key);
        }
    }

    /// Record a connector type that exists but cannot be built here
    pub fn register_unavailable(&self, metadata: ConnectorMetadata) {
        let mut metadata = metadata.unavailable();
        let key = normalize(&metadata.name);
        metadata.name = key.clone();
        self.entries.write().insert(
            key,
            RegistryEntry {
                metadata,
                factory: None,
            },
        );
    }

    /// Build an unconnected connector for a data source config
    ///
    /// # Errors
    ///
    /// `UnknownConnectorType` if the type is not registered, `Connection` if
    /// the type is compiled out, `Config` if `options` fail the type's schema.
    pub fn create(&self, config: &ConnectionConfig) -> Result<Arc<dyn Connector>> {
        let key = config.type_key();

        let (metadata, factory) = {
            let entries = self.entries.read();
            match entries.get(&key) {
                Some(entry) => (entry.metadata.clone(), entry.factory.clone()),
                None => {
                    let mut available: Vec<String> = entries.keys().cloned().collect();
                    available.sort();
                    return Err(RetailscopeError::UnknownConnectorType {
                        requested: config.connector_type.clone(),
                        available,
                    });
                }
            }
        };

        let Some(factory) = factory else {
            return Err(RetailscopeError::connection(format!(
                "Connector type '{}' is not available in this build",
                key
            )));
        };

        metadata.config_schema.validate(&config.options).map_err(|problems| {
            RetailscopeError::Config(format!(
                "Invalid options for data source '{}' ({}): {}",
                config.id, key, problems
            ))
        })?;

        Ok(factory(config))
    }

    /// Metadata of every registered type, sorted by name
    pub fn list(&self) -> Vec<ConnectorMetadata> {
        let mut list: Vec<ConnectorMetadata> = self
            .entries
            .read()
            .values()
            .map(|entry| entry.metadata.clone())
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Registered type keys, sorted
    pub fn types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.entries.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// Metadata of a single type
    pub fn metadata(&self, connector_type: &str) -> Option<ConnectorMetadata> {
        self.entries
            .read()
            .get(&normalize(connector_type))
            .map(|entry| entry.metadata.clone())
    }

    /// Check if a type is registered
    pub fn contains(&self, connector_type: &str) -> bool {
        self.entries.read().contains_key(&normalize(connector_type))
    }
}

impl Default for ConnectorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize(connector_type: &str) -> String {
    connector_type.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectors::testing::StubConnector;
    use retailscope_types::FieldType;
    use serde_json::json;

    fn stub_factory() -> ConnectorFactory {
        Arc::new(|_: &ConnectionConfig| Arc::new(StubConnector::new("Stub")) as Arc<dyn Connector>)
    }

    #[test]
    fn test_create_registered_type() {
        let registry = ConnectorRegistry::new();
        registry.register("stub", stub_factory(), ConnectorMetadata::new("stub", "Stub"));

        let connector = registry.create(&ConnectionConfig::new("s1", "stub")).unwrap();
        assert!(!connector.is_connected());
    }

    #[test]
    fn test_type_keys_are_case_insensitive() {
        let registry = ConnectorRegistry::new();
        registry.register("Stub", stub_factory(), ConnectorMetadata::new("Stub", "Stub"));

        assert!(registry.contains("STUB"));
        assert!(registry.create(&ConnectionConfig::new("s1", "sTuB")).is_ok());
        assert_eq!(registry.types(), vec!["stub"]);
    }

    #[test]
    fn test_unknown_type_lists_available() {
        let registry = ConnectorRegistry::new();
        registry.register("stub", stub_factory(), ConnectorMetadata::new("stub", "Stub"));
        registry.register("alpha", stub_factory(), ConnectorMetadata::new("alpha", "Alpha"));

        let err = registry
            .create(&ConnectionConfig::new("x", "oracle"))
            .err()
            .unwrap();
        match err {
            RetailscopeError::UnknownConnectorType {
                requested,
                available,
            } => {
                assert_eq!(requested, "oracle");
                assert_eq!(available, vec!["alpha", "stub"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_duplicate_registration_last_write_wins() {
        let registry = ConnectorRegistry::new();
        registry.register("stub", stub_factory(), ConnectorMetadata::new("stub", "First"));
        registry.register("STUB", stub_factory(), ConnectorMetadata::new("stub", "Second"));

        assert_eq!(registry.list().len(), 1);
        assert_eq!(registry.metadata("stub").unwrap().display_name, "Second");
    }

    #[test]
    fn test_options_validated_against_schema() {
        let registry = ConnectorRegistry::new();
        registry.register(
            "stub",
            stub_factory(),
            ConnectorMetadata::new("stub", "Stub").required("file_path", FieldType::String, "Path"),
        );

        let err = registry
            .create(&ConnectionConfig::new("s1", "stub"))
            .err()
            .unwrap();
        assert_eq!(err.code(), "CONFIG_ERROR");

        let ok = ConnectionConfig::new("s1", "stub").with_option("file_path", json!("/tmp/x.csv"));
        assert!(registry.create(&ok).is_ok());
    }

    #[test]
    fn test_unavailable_type() {
        let registry = ConnectorRegistry::new();
        registry.register_unavailable(ConnectorMetadata::new("oracle", "Oracle"));

        assert!(registry.contains("oracle"));
        assert!(!registry.metadata("oracle").unwrap().available);
        let err = registry
            .create(&ConnectionConfig::new("o", "oracle"))
            .err()
            .unwrap();
        assert_eq!(err.code(), "CONNECTION_ERROR");
    }

    #[test]
    fn test_builtins() {
        let registry = ConnectorRegistry::with_builtins();
        for key in ["memory", "csv", "rest-api", "postgres", "mysql", "mongodb"] {
            assert!(registry.contains(key), "missing builtin {key}");
        }
        let names: Vec<String> = registry.list().into_iter().map(|m| m.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
