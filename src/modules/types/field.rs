//! JSON field type definitions used by config schemas and column introspection

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Type of a configuration field or a result column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    /// UTF-8 string
    String,
    /// Whole number
    Integer,
    /// Any number (integers included)
    Number,
    /// true/false
    Boolean,
    /// Nested JSON object
    Object,
    /// JSON array
    Array,
    /// Type could not be determined (e.g. only nulls seen)
    Unknown,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FieldType::String => "string",
            FieldType::Integer => "integer",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Object => "object",
            FieldType::Array => "array",
            FieldType::Unknown => "unknown",
        };
        f.write_str(name)
    }
}

impl FromStr for FieldType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "string" | "str" | "text" => Ok(FieldType::String),
            "integer" | "int" => Ok(FieldType::Integer),
            "number" | "float" | "double" => Ok(FieldType::Number),
            "boolean" | "bool" => Ok(FieldType::Boolean),
            "object" | "map" => Ok(FieldType::Object),
            "array" | "list" => Ok(FieldType::Array),
            _ => Err(format!("Unknown field type: {}", s)),
        }
    }
}

impl FieldType {
    /// Infer the field type of a JSON value
    pub fn of(value: &serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::Null => FieldType::Unknown,
            Value::Bool(_) => FieldType::Boolean,
            Value::Number(n) if n.is_i64() || n.is_u64() => FieldType::Integer,
            Value::Number(_) => FieldType::Number,
            Value::String(_) => FieldType::String,
            Value::Array(_) => FieldType::Array,
            Value::Object(_) => FieldType::Object,
        }
    }

    /// Check whether a JSON value is acceptable for this field type
    pub fn accepts(&self, value: &serde_json::Value) -> bool {
        match self {
            FieldType::String => value.is_string(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Number => value.is_number(),
            FieldType::Boolean => value.is_boolean(),
            FieldType::Object => value.is_object(),
            FieldType::Array => value.is_array(),
            FieldType::Unknown => true,
        }
    }

    /// Widen two observed types into one that accepts both
    pub fn merge(self, other: FieldType) -> FieldType {
        match (self, other) {
            (a, b) if a == b => a,
            (FieldType::Unknown, b) => b,
            (a, FieldType::Unknown) => a,
            (FieldType::Integer, FieldType::Number) | (FieldType::Number, FieldType::Integer) => {
                FieldType::Number
            }
            _ => FieldType::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_type_from_str() {
        assert_eq!(FieldType::from_str("string").unwrap(), FieldType::String);
        assert_eq!(FieldType::from_str("INT").unwrap(), FieldType::Integer);
        assert_eq!(FieldType::from_str("float").unwrap(), FieldType::Number);
        assert_eq!(FieldType::from_str("bool").unwrap(), FieldType::Boolean);
        assert!(FieldType::from_str("uuid").is_err());
    }

    #[test]
    fn test_field_type_of() {
        assert_eq!(FieldType::of(&json!("a")), FieldType::String);
        assert_eq!(FieldType::of(&json!(3)), FieldType::Integer);
        assert_eq!(FieldType::of(&json!(3.5)), FieldType::Number);
        assert_eq!(FieldType::of(&json!(null)), FieldType::Unknown);
        assert_eq!(FieldType::of(&json!({"k": 1})), FieldType::Object);
    }

    #[test]
    fn test_field_type_accepts() {
        assert!(FieldType::Number.accepts(&json!(42)));
        assert!(!FieldType::Integer.accepts(&json!(4.2)));
        assert!(!FieldType::String.accepts(&json!(1)));
        assert!(FieldType::Object.accepts(&json!({})));
    }

    #[test]
    fn test_field_type_merge() {
        assert_eq!(FieldType::Integer.merge(FieldType::Number), FieldType::Number);
        assert_eq!(FieldType::Unknown.merge(FieldType::Boolean), FieldType::Boolean);
        assert_eq!(FieldType::Boolean.merge(FieldType::Integer), FieldType::String);
    }
}
