//! Configuration validation

use once_cell::sync::Lazy;
use regex::Regex;
use retailscope_core::{DashboardConfig, RetailscopeError, DEFAULT_MEMORY_ID};
use std::collections::HashSet;

/// Regex pattern for valid names (lower-kebab-case or lower_snake_case)
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9]*(?:[-_][a-z0-9]+)*$").unwrap());

/// Connector type keys: lowercase words joined by dashes
static TYPE_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]*$").unwrap());

/// Configuration validator
pub struct ConfigValidator {
    /// Whether to validate names strictly
    strict_names: bool,
}

impl ConfigValidator {
    /// Create a new validator with default settings
    pub fn new() -> Self {
        Self { strict_names: true }
    }

    /// Create a validator with lenient name checking
    pub fn lenient() -> Self {
        Self {
            strict_names: false,
        }
    }

    /// Validate the entire configuration
    pub fn validate(&self, config: &DashboardConfig) -> Result<(), RetailscopeError> {
        self.validate_name(&config.name)?;
        self.validate_sources(config)?;
        self.validate_references(config)?;
        Ok(())
    }

    fn validate_name(&self, name: &str) -> Result<(), RetailscopeError> {
        if name.is_empty() {
            return Err(RetailscopeError::Validation(
                "Dashboard name cannot be empty".to_string(),
            ));
        }

        if self.strict_names && !NAME_PATTERN.is_match(name) {
            return Err(RetailscopeError::Validation(format!(
                "Invalid dashboard name '{}': must be lower-kebab-case or lower_snake_case",
                name
            )));
        }

        Ok(())
    }

    fn validate_sources(&self, config: &DashboardConfig) -> Result<(), RetailscopeError> {
        let mut ids = HashSet::new();

        for source in &config.data_sources {
            if source.id.is_empty() {
                return Err(RetailscopeError::Validation(
                    "Data source id cannot be empty".to_string(),
                ));
            }

            if self.strict_names && !NAME_PATTERN.is_match(&source.id) {
                return Err(RetailscopeError::Validation(format!(
                    "Invalid data source id '{}': must be lower-kebab-case or lower_snake_case",
                    source.id
                )));
            }

            // Created by the manager itself
            if source.id == DEFAULT_MEMORY_ID {
                return Err(RetailscopeError::Validation(format!(
                    "Data source id '{}' is reserved for the built-in memory source",
                    DEFAULT_MEMORY_ID
                )));
            }

            if !ids.insert(source.id.as_str()) {
                return Err(RetailscopeError::Validation(format!(
                    "Duplicate data source id: '{}'",
                    source.id
                )));
            }

            if !TYPE_PATTERN.is_match(&source.type_key()) {
                return Err(RetailscopeError::Validation(format!(
                    "Data source '{}' has an invalid type '{}'",
                    source.id, source.connector_type
                )));
            }

            if source.timeout_secs == Some(0) {
                return Err(RetailscopeError::Validation(format!(
                    "Data source '{}': timeout_secs must be greater than zero",
                    source.id
                )));
            }
        }

        Ok(())
    }

    /// `default` and every `fallback` must name a configured source (or the built-in one)
    fn validate_references(&self, config: &DashboardConfig) -> Result<(), RetailscopeError> {
        let known: HashSet<&str> = config
            .data_sources
            .iter()
            .map(|s| s.id.as_str())
            .chain(std::iter::once(DEFAULT_MEMORY_ID))
            .collect();

        if let Some(default) = &config.default_source {
            if !known.contains(default.as_str()) {
                return Err(RetailscopeError::Validation(format!(
                    "Default data source '{}' is not configured",
                    default
                )));
            }
        }

        for source in &config.data_sources {
            let Some(fallback) = &source.fallback else {
                continue;
            };

            if fallback == &source.id {
                return Err(RetailscopeError::Validation(format!(
                    "Data source '{}' cannot fall back to itself",
                    source.id
                )));
            }

            if !known.contains(fallback.as_str()) {
                return Err(RetailscopeError::Validation(format!(
                    "Data source '{}' references non-existent fallback: '{}'",
                    source.id, fallback
                )));
            }
        }

        Ok(())
    }
}

impl Default for ConfigValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use retailscope_core::ConnectionConfig;

    fn config_with_source() -> DashboardConfig {
        DashboardConfig::new("retail-dashboard").with_source(
            ConnectionConfig::new("warehouse", "postgres").with_fallback(DEFAULT_MEMORY_ID),
        )
    }

    #[test]
    fn test_valid_config() {
        let mut config = config_with_source();
        config.default_source = Some("warehouse".to_string());
        assert!(ConfigValidator::new().validate(&config).is_ok());
    }

    #[test]
    fn test_invalid_dashboard_name() {
        let config = DashboardConfig::new("Retail Dashboard");
        assert!(ConfigValidator::new().validate(&config).is_err());
        assert!(ConfigValidator::lenient().validate(&config).is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let config = config_with_source().with_source(ConnectionConfig::new("warehouse", "mysql"));
        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(err.to_string().contains("Duplicate data source id"));
    }

    #[test]
    fn test_reserved_id() {
        let config = DashboardConfig::new("d")
            .with_source(ConnectionConfig::new(DEFAULT_MEMORY_ID, "memory"));
        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(err.to_string().contains("reserved"));
    }

    #[test]
    fn test_missing_fallback_reference() {
        let config = DashboardConfig::new("d")
            .with_source(ConnectionConfig::new("warehouse", "postgres").with_fallback("mock"));
        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(err.to_string().contains("non-existent fallback"));
    }

    #[test]
    fn test_self_fallback() {
        let config = DashboardConfig::new("d")
            .with_source(ConnectionConfig::new("warehouse", "postgres").with_fallback("warehouse"));
        let err = ConfigValidator::new().validate(&config).unwrap_err();
        assert!(err.to_string().contains("itself"));
    }

    #[test]
    fn test_unknown_default() {
        let mut config = config_with_source();
        config.default_source = Some("elsewhere".to_string());
        assert!(ConfigValidator::new().validate(&config).is_err());
    }

    #[test]
    fn test_zero_timeout() {
        let config = DashboardConfig::new("d")
            .with_source(ConnectionConfig::new("api", "rest-api").with_timeout_secs(0));
        assert!(ConfigValidator::new().validate(&config).is_err());
    }
}
