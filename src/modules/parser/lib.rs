//! Configuration parsing for Retailscope
//!
//! This crate handles parsing of the YAML dashboard configuration,
//! validation, and environment variable substitution.

pub mod env;
pub mod validator;
pub mod yaml;

pub use validator::ConfigValidator;
pub use yaml::YamlParser;

use retailscope_core::{DashboardConfig, RetailscopeError};
use tracing::debug;

/// Parse a configuration file from a path
pub fn parse_file(path: &str) -> Result<DashboardConfig, RetailscopeError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| RetailscopeError::Config(format!("Failed to read file '{}': {}", path, e)))?;

    debug!("Read {} bytes of configuration from {}", content.len(), path);
    parse_string(&content)
}

/// Parse a configuration from a string
pub fn parse_string(content: &str) -> Result<DashboardConfig, RetailscopeError> {
    let config = YamlParser::parse(content)?;

    let validator = ConfigValidator::new();
    validator.validate(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_parse_simple_config() {
        let yaml = r#"
name: retail-dashboard
default: sales-file
data_sources:
  sales-file:
    type: csv
    options:
      file_path: ./data/transactions.csv
"#;
        let config = parse_string(yaml).unwrap();
        assert_eq!(config.name, "retail-dashboard");
        assert_eq!(config.data_sources.len(), 1);
        assert_eq!(config.default_source.as_deref(), Some("sales-file"));
    }

    #[test]
    fn test_parse_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "name: from-disk\ndata_sources: []").unwrap();

        let config = parse_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.name, "from-disk");
    }

    #[test]
    fn test_parse_missing_file() {
        let err = parse_file("/nonexistent/retailscope.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read file"));
    }
}
