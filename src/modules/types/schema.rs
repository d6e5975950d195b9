//! Introspection shapes: tables and their columns

use serde::{Deserialize, Serialize};

use crate::field::FieldType;
use crate::result::Record;

/// A logical collection exposed by a data source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_count: Option<u64>,
}

/// A column (or document field) of a table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: FieldType,
    /// Backend-native type name, when the backend reports one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub native_type: Option<String>,
    pub nullable: bool,
}

/// Columns of a single table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
}

/// Full schema of a data source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DataSourceSchema {
    pub tables: Vec<TableSchema>,
}

impl TableSchema {
    /// Infer a table schema from sample rows; columns are sorted by name
    pub fn infer<'a>(name: impl Into<String>, rows: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut columns: Vec<ColumnInfo> = Vec::new();
        let mut seen_rows = 0usize;
        let mut present: Vec<usize> = Vec::new();

        for row in rows {
            seen_rows += 1;
            for (key, value) in row {
                let observed = FieldType::of(value);
                match columns.iter().position(|c| &c.name == key) {
                    Some(idx) => {
                        let column = &mut columns[idx];
                        column.data_type = column.data_type.merge(observed);
                        column.nullable |= value.is_null();
                        present[idx] += 1;
                    }
                    None => {
                        columns.push(ColumnInfo {
                            name: key.clone(),
                            data_type: observed,
                            native_type: None,
                            nullable: value.is_null(),
                        });
                        present.push(1);
                    }
                }
            }
        }

        // A column missing from some rows is nullable too
        for (column, count) in columns.iter_mut().zip(present) {
            if count < seen_rows {
                column.nullable = true;
            }
        }
        columns.sort_by(|a, b| a.name.cmp(&b.name));

        Self {
            name: name.into(),
            columns,
        }
    }

    /// Find a column by name
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn record(pairs: &[(&str, serde_json::Value)]) -> Record {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect::<HashMap<_, _>>()
    }

    #[test]
    fn test_infer_merges_types_and_nullability() {
        let rows = vec![
            record(&[("amount", json!(10)), ("store", json!("Makati"))]),
            record(&[("amount", json!(12.5))]),
        ];
        let schema = TableSchema::infer("transactions", &rows);

        let amount = schema.column("amount").unwrap();
        assert_eq!(amount.data_type, FieldType::Number);
        assert!(!amount.nullable);

        let store = schema.column("store").unwrap();
        assert_eq!(store.data_type, FieldType::String);
        assert!(store.nullable);
    }

    #[test]
    fn test_infer_empty() {
        let schema = TableSchema::infer("empty", std::iter::empty::<&Record>());
        assert!(schema.columns.is_empty());
    }
}
