//! Descriptive metadata for registered connector types

use retailscope_types::FieldType;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Immutable description of a connector type, fixed at registration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorMetadata {
    /// Registry key (lowercase)
    pub name: String,
    pub display_name: String,
    pub description: String,
    pub version: String,
    pub author: String,
    /// Icon hint for UIs
    pub icon: String,
    /// Recognized `options` fields
    pub config_schema: ConfigSchema,
    /// False when the backend is compiled out of this build
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

/// Declarative description of a connector's `options`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ConfigSchema {
    pub fields: Vec<ConfigField>,
}

/// A single recognized option
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigField {
    pub name: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ConnectorMetadata {
    /// Create metadata for a connector type; the name is case-folded
    pub fn new(name: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            name: name.into().to_lowercase(),
            display_name: display_name.into(),
            description: String::new(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            author: "Retailscope".to_string(),
            icon: "database".to_string(),
            config_schema: ConfigSchema::default(),
            available: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Add a required option
    pub fn required(mut self, name: &str, field_type: FieldType, description: &str) -> Self {
        self.config_schema.fields.push(ConfigField {
            name: name.to_string(),
            field_type,
            required: true,
            description: Some(description.to_string()),
        });
        self
    }

    /// Add an optional option
    pub fn optional(mut self, name: &str, field_type: FieldType, description: &str) -> Self {
        self.config_schema.fields.push(ConfigField {
            name: name.to_string(),
            field_type,
            required: false,
            description: Some(description.to_string()),
        });
        self
    }

    /// Mark the connector type as unavailable in this build
    pub fn unavailable(mut self) -> Self {
        self.available = false;
        self
    }
}

impl ConfigSchema {
    /// Find a field by name
    pub fn field(&self, name: &str) -> Option<&ConfigField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Names of the required fields
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }

    /// Check options against the schema.
    ///
    /// Unknown keys are allowed. All problems found are reported together.
    pub fn validate(&self, options: &Map<String, Value>) -> Result<(), String> {
        let mut problems = Vec::new();

        for field in &self.fields {
            match options.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    problems.push(format!("missing required option '{}'", field.name));
                }
                Some(value) if !value.is_null() && !field.field_type.accepts(value) => {
                    problems.push(format!(
                        "option '{}' must be of type {}, got {}",
                        field.name,
                        field.field_type,
                        FieldType::of(value)
                    ));
                }
                _ => {}
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn csv_metadata() -> ConnectorMetadata {
        ConnectorMetadata::new("CSV", "CSV File Connector")
            .with_icon("file-text")
            .required("file_path", FieldType::String, "Path to the CSV file")
            .optional("delimiter", FieldType::String, "Field delimiter")
    }

    #[test]
    fn test_metadata_name_is_lowercase() {
        let meta = csv_metadata();
        assert_eq!(meta.name, "csv");
        assert!(meta.available);
        let required: Vec<&str> = meta.config_schema.required_fields().collect();
        assert_eq!(required, vec!["file_path"]);
    }

    #[test]
    fn test_schema_validate_ok() {
        let options = json!({"file_path": "/data/tx.csv", "extra": 1});
        assert!(csv_metadata()
            .config_schema
            .validate(options.as_object().unwrap())
            .is_ok());
    }

    #[test]
    fn test_schema_validate_reports_all_problems() {
        let options = json!({"delimiter": 9});
        let err = csv_metadata()
            .config_schema
            .validate(options.as_object().unwrap())
            .unwrap_err();
        assert!(err.contains("missing required option 'file_path'"));
        assert!(err.contains("option 'delimiter' must be of type string, got integer"));
    }

    #[test]
    fn test_metadata_serde_camel_case() {
        let json = serde_json::to_value(csv_metadata()).unwrap();
        assert_eq!(json["displayName"], json!("CSV File Connector"));
        assert_eq!(json["configSchema"]["fields"][0]["type"], json!("string"));
    }
}
