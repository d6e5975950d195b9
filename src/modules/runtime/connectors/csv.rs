//! CSV file connector: loads a flat file into memory at connect

use async_trait::async_trait;
use parking_lot::RwLock;
use retailscope_core::{ConnectionConfig, ConnectorMetadata, Result, RetailscopeError};
use retailscope_types::{
    Capabilities, ConnectionTest, FieldType, QueryName, QueryRequest, QueryResult, Record,
    TableInfo, TableSchema,
};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

use super::lifecycle::Lifecycle;
use super::traits::Connector;
use crate::dataset::{self, ColumnMap, Transaction};

#[derive(Debug, Deserialize)]
struct CsvOptions {
    file_path: PathBuf,
    #[serde(default)]
    delimiter: Option<String>,
    #[serde(default = "default_has_headers")]
    has_headers: bool,
    /// Table name; defaults to the file stem
    #[serde(default)]
    table: Option<String>,
    #[serde(default)]
    columns: ColumnMap,
}

fn default_has_headers() -> bool {
    true
}

struct CsvTable {
    label: String,
    path: PathBuf,
    name: String,
    rows: Arc<Vec<Record>>,
    transactions: Arc<Vec<Transaction>>,
}

/// Connector over a single CSV file
pub struct CsvConnector {
    lifecycle: Lifecycle,
    table: RwLock<Option<CsvTable>>,
}

impl CsvConnector {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            table: RwLock::new(None),
        }
    }

    /// Registry metadata for the `csv` type
    pub fn describe() -> ConnectorMetadata {
        ConnectorMetadata::new("csv", "CSV File")
            .with_description("Transactions loaded from a delimited text file")
            .with_icon("file-text")
            .required("file_path", FieldType::String, "Path to the CSV file")
            .optional("delimiter", FieldType::String, "Field delimiter (default ',')")
            .optional(
                "has_headers",
                FieldType::Boolean,
                "First line holds column names (default true)",
            )
            .optional("table", FieldType::String, "Table name (default: file stem)")
            .optional(
                "columns",
                FieldType::Object,
                "Column mapping for date, amount, product, store, items, status, id",
            )
    }

    fn snapshot(&self) -> Result<(String, String, Arc<Vec<Record>>, Arc<Vec<Transaction>>)> {
        let guard = self.table.read();
        match guard.as_ref() {
            Some(table) if self.lifecycle.is_connected() => Ok((
                table.label.clone(),
                table.name.clone(),
                table.rows.clone(),
                table.transactions.clone(),
            )),
            _ => Err(RetailscopeError::connection("CSV data source is not connected")),
        }
    }
}

impl Default for CsvConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse CSV bytes into records, inferring scalar types per field
fn parse_csv(
    bytes: &[u8],
    delimiter: u8,
    has_headers: bool,
) -> std::result::Result<Vec<Record>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = if has_headers {
        reader.headers()?.iter().map(str::to_string).collect()
    } else {
        Vec::new()
    };

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        let row: Record = record
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let name = headers
                    .get(i)
                    .cloned()
                    .unwrap_or_else(|| format!("column_{}", i + 1));
                (name, infer_value(field))
            })
            .collect();
        rows.push(row);
    }
    Ok(rows)
}

fn infer_value(field: &str) -> Value {
    if field.is_empty() {
        return Value::Null;
    }
    match field {
        "true" | "TRUE" | "True" => return Value::Bool(true),
        "false" | "FALSE" | "False" => return Value::Bool(false),
        _ => {}
    }
    // Codes like "00123" stay text
    let leading_zero = field.len() > 1 && field.starts_with('0') && !field.starts_with("0.");
    if !leading_zero {
        if let Ok(i) = field.parse::<i64>() {
            return Value::Number(i.into());
        }
        if let Ok(f) = field.parse::<f64>() {
            if let Some(n) = serde_json::Number::from_f64(f) {
                return Value::Number(n);
            }
        }
    }
    Value::String(field.to_string())
}

fn parse_delimiter(delimiter: Option<&str>) -> Option<u8> {
    match delimiter {
        None => Some(b','),
        Some("\\t") | Some("tab") => Some(b'\t'),
        Some(d) if d.len() == 1 && d.is_ascii() => d.bytes().next(),
        Some(_) => None,
    }
}

#[async_trait]
impl Connector for CsvConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<()> {
        let Some(attempt) = self.lifecycle.begin_connect().await else {
            return Ok(());
        };

        let options: CsvOptions = config
            .options_as()
            .map_err(|e| RetailscopeError::connection_failed("Invalid CSV options", config, e))?;

        let delimiter = parse_delimiter(options.delimiter.as_deref()).ok_or_else(|| {
            RetailscopeError::connection_failed(
                "Invalid CSV options",
                config,
                "delimiter must be a single ASCII character",
            )
        })?;

        let bytes = tokio::fs::read(&options.file_path).await.map_err(|e| {
            RetailscopeError::connection_failed(
                format!("Cannot read CSV file '{}'", options.file_path.display()),
                config,
                e,
            )
        })?;

        let has_headers = options.has_headers;
        let rows = tokio::task::spawn_blocking(move || parse_csv(&bytes, delimiter, has_headers))
            .await
            .map_err(|e| RetailscopeError::Internal(format!("CSV parse task failed: {}", e)))?
            .map_err(|e| {
                RetailscopeError::connection_failed(
                    format!("Malformed CSV file '{}'", options.file_path.display()),
                    config,
                    e,
                )
            })?;

        let transactions = dataset::aggregate::transactions_from_records(&rows, &options.columns);
        if transactions.len() < rows.len() {
            warn!(
                "CSV data source '{}': {} of {} rows lack a usable date/amount \
                 and are ignored by dashboard queries",
                config.id,
                rows.len() - transactions.len(),
                rows.len()
            );
        }

        let name = options.table.clone().unwrap_or_else(|| {
            options
                .file_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "data".to_string())
        });

        debug!(
            "CSV data source '{}' loaded {} rows from {}",
            config.id,
            rows.len(),
            options.file_path.display()
        );

        *self.table.write() = Some(CsvTable {
            label: config.label_or("CSV File"),
            path: options.file_path,
            name,
            rows: Arc::new(rows),
            transactions: Arc::new(transactions),
        });

        attempt.succeed();
        Ok(())
    }

    async fn test_connection(&self) -> ConnectionTest {
        let path = {
            let guard = self.table.read();
            match guard.as_ref() {
                Some(table) if self.lifecycle.is_connected() => table.path.clone(),
                _ => return ConnectionTest::failed("CSV data source is not connected"),
            }
        };

        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => ConnectionTest::ok("CSV file is readable")
                .with_details(serde_json::json!({
                    "path": path.display().to_string(),
                    "bytes": meta.len(),
                })),
            Ok(_) => ConnectionTest::failed(format!("'{}' is not a file", path.display())),
            Err(e) => ConnectionTest::failed(format!("Cannot access '{}': {}", path.display(), e)),
        }
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        let started = Instant::now();
        let (label, name, rows, transactions) = self.snapshot()?;

        let data = match request {
            QueryRequest::Named { name: query, .. } => {
                dataset::answer(*query, &transactions, request.days())
            }
            QueryRequest::Native { statement } if statement.trim() == name => rows.as_ref().clone(),
            QueryRequest::Native { statement } => {
                return Err(RetailscopeError::malformed(format!(
                    "Table '{}' not found (this source exposes '{}')",
                    statement.trim(),
                    name
                )))
            }
        };

        Ok(QueryResult::new(data, label, started.elapsed().as_millis() as u64))
    }

    async fn get_tables(&self) -> Result<Vec<TableInfo>> {
        let (_, name, rows, _) = self.snapshot()?;
        Ok(vec![TableInfo {
            name,
            row_count: Some(rows.len() as u64),
        }])
    }

    async fn get_table_schema(&self, table: &str) -> Result<TableSchema> {
        let (_, name, rows, _) = self.snapshot()?;
        if table != name {
            return Err(RetailscopeError::malformed(format!("Table '{}' not found", table)));
        }
        Ok(TableSchema::infer(name, rows.iter()))
    }

    async fn disconnect(&self) {
        let Some(_attempt) = self.lifecycle.begin_disconnect().await else {
            return;
        };
        self.table.write().take();
    }

    fn is_connected(&self) -> bool {
        self.lifecycle.is_connected()
    }

    fn metadata(&self) -> ConnectorMetadata {
        Self::describe()
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            queries: QueryName::all().to_vec(),
            native_queries: true,
            introspection: true,
            remote: false,
        }
    }

    fn connector_type(&self) -> &'static str {
        "csv"
    }
}
