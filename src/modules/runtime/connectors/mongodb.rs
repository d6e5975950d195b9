//! MongoDB connector: aggregation pipelines for dashboard queries, run_command passthrough

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::error::{Error as MongoError, ErrorKind};
use mongodb::{options::ClientOptions, Client, Database};
use parking_lot::RwLock;
use retailscope_core::{ConnectionConfig, ConnectorMetadata, QueryFailure, Result, RetailscopeError};
use retailscope_types::{
    clamp_days, Capabilities, ConnectionTest, FieldType, QueryName, QueryRequest, QueryResult,
    Record, TableInfo, TableSchema,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Instant;
use tracing::{debug, info};

use super::lifecycle::Lifecycle;
use super::traits::Connector;
use crate::dataset::aggregate::{RECENT_LIMIT, TOP_PRODUCTS_LIMIT};
use crate::dataset::{self, ColumnMap};

const DAY_MILLIS: i64 = 86_400_000;
const SCHEMA_SAMPLE: i64 = 50;

#[derive(Debug, Clone, Deserialize)]
struct MongoOptions {
    #[serde(alias = "uri")]
    url: String,
    #[serde(default)]
    database: Option<String>,
    #[serde(default = "default_collection")]
    collection: String,
    #[serde(default)]
    columns: ColumnMap,
}

fn default_collection() -> String {
    "transactions".to_string()
}

#[derive(Clone)]
struct MongoSession {
    database: Database,
    collection: String,
    columns: ColumnMap,
    label: String,
}

impl MongoSession {
    async fn aggregate(&self, collection: &str, pipeline: Vec<Document>) -> Result<Vec<Document>> {
        let cursor = self
            .database
            .collection::<Document>(collection)
            .aggregate(pipeline, None)
            .await
            .map_err(classify)?;
        cursor.try_collect().await.map_err(classify)
    }

    /// Start of the `days` window ending on the latest transaction, if any
    async fn window_start(&self, days: u32) -> Result<Option<bson::DateTime>> {
        let latest = self
            .aggregate(&self.collection, latest_pipeline(&self.columns))
            .await?;
        Ok(latest
            .first()
            .and_then(|d| d.get_datetime(&self.columns.date).ok())
            .map(|latest| {
                bson::DateTime::from_millis(window_start_millis(latest.timestamp_millis(), days))
            }))
    }

    async fn dashboard(&self, name: QueryName, days: u32) -> Result<Vec<Record>> {
        let columns = &self.columns;
        if name == QueryName::Transactions {
            let docs = self.aggregate(&self.collection, recent_pipeline(columns)).await?;
            return Ok(docs.iter().map(document_to_row).collect());
        }

        let Some(start) = self.window_start(days).await? else {
            return Ok(dataset::answer(name, &[], days));
        };

        match name {
            QueryName::Kpis => {
                let totals = self.aggregate(&self.collection, kpi_pipeline(columns, start)).await?;
                let top = self
                    .aggregate(&self.collection, top_products_pipeline(columns, start, 1))
                    .await?;
                let mut row = totals
                    .first()
                    .map(document_to_row)
                    .unwrap_or_else(|| dataset::answer(name, &[], days).remove(0));
                row.insert(
                    "topProduct".to_string(),
                    top.first()
                        .and_then(|d| d.get("name").cloned())
                        .map(bson_to_json)
                        .unwrap_or(serde_json::Value::Null),
                );
                Ok(vec![row])
            }
            QueryName::Trends => {
                let docs = self.aggregate(&self.collection, trends_pipeline(columns, start)).await?;
                Ok(docs.iter().map(document_to_row).collect())
            }
            _ => {
                let pipeline = top_products_pipeline(columns, start, TOP_PRODUCTS_LIMIT as i64);
                let docs = self.aggregate(&self.collection, pipeline).await?;
                Ok(docs.iter().map(document_to_row).collect())
            }
        }
    }

    /// Run a read-only JSON command document against the configured database
    async fn run_command(&self, statement: &str) -> Result<Vec<Record>> {
        let value: serde_json::Value = serde_json::from_str(statement)
            .map_err(|e| {
                RetailscopeError::malformed(format!("Invalid MongoDB statement JSON: {}", e))
            })?;

        let bson = bson::to_bson(&value)
            .map_err(|e| RetailscopeError::malformed(format!("JSON to BSON failed: {}", e)))?;

        let mut doc = match bson {
            Bson::Document(d) => d,
            _ => {
                return Err(RetailscopeError::malformed(
                    "MongoDB statement must be a JSON object",
                ))
            }
        };

        match doc.remove("database") {
            None => {}
            Some(Bson::String(name)) if name == self.database.name() => {}
            Some(other) => {
                return Err(RetailscopeError::malformed(format!(
                    "MongoDB statement may only target database '{}', got {}",
                    self.database.name(),
                    other
                )))
            }
        }
        check_read_only(&doc).map_err(RetailscopeError::malformed)?;

        let result = self.database.run_command(doc, None).await.map_err(classify)?;
        Ok(result_to_rows(result))
    }
}

/// MongoDB connector
pub struct MongoDbConnector {
    lifecycle: Lifecycle,
    session: RwLock<Option<MongoSession>>,
}

impl MongoDbConnector {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            session: RwLock::new(None),
        }
    }

    /// Registry metadata for the `mongodb` type
    pub fn describe() -> ConnectorMetadata {
        ConnectorMetadata::new("mongodb", "MongoDB")
            .with_description("Transactions collection in a MongoDB database")
            .with_icon("leaf")
            .required("url", FieldType::String, "Connection string (mongodb://host:27017/db)")
            .optional("database", FieldType::String, "Database, when the URL has none")
            .optional(
                "collection",
                FieldType::String,
                "Transactions collection (default transactions)",
            )
            .optional("columns", FieldType::Object, "Field names of the transaction documents")
    }

    fn session(&self) -> Result<MongoSession> {
        match self.session.read().as_ref() {
            Some(session) if self.lifecycle.is_connected() => Ok(session.clone()),
            _ => Err(RetailscopeError::connection("MongoDB data source is not connected")),
        }
    }
}

impl Default for MongoDbConnector {
    fn default() -> Self {
        Self::new()
    }
}

/// Day-aligned (UTC) start of a window of `days` ending on `latest`
fn window_start_millis(latest: i64, days: u32) -> i64 {
    let day_start = latest - latest.rem_euclid(DAY_MILLIS);
    day_start - (i64::from(clamp_days(days)) - 1) * DAY_MILLIS
}

fn field(name: &str) -> String {
    format!("${}", name)
}

fn latest_pipeline(columns: &ColumnMap) -> Vec<Document> {
    let date = columns.date.as_str();
    vec![
        doc! { "$match": { date: { "$type": "date" } } },
        doc! { "$sort": { date: -1 } },
        doc! { "$limit": 1 },
        doc! { "$project": { "_id": 0, date: 1 } },
    ]
}

fn window_match(columns: &ColumnMap, start: bson::DateTime) -> Document {
    let date = columns.date.as_str();
    doc! { "$match": { date: { "$gte": start } } }
}

fn kpi_pipeline(columns: &ColumnMap, start: bson::DateTime) -> Vec<Document> {
    vec![
        window_match(columns, start),
        doc! {
            "$group": {
                "_id": Bson::Null,
                "totalRevenue": { "$sum": field(&columns.amount) },
                "transactionCount": { "$sum": 1 },
                "avgBasketSize": { "$avg": field(&columns.amount) },
                "stores": { "$addToSet": field(&columns.store) },
            }
        },
        doc! {
            "$project": {
                "_id": 0,
                "totalRevenue": { "$round": ["$totalRevenue", 2] },
                "transactionCount": 1,
                "avgBasketSize": { "$round": ["$avgBasketSize", 2] },
                "storeCount": { "$size": "$stores" },
            }
        },
    ]
}

fn trends_pipeline(columns: &ColumnMap, start: bson::DateTime) -> Vec<Document> {
    vec![
        window_match(columns, start),
        doc! {
            "$group": {
                "_id": { "$dateToString": { "format": "%Y-%m-%d", "date": field(&columns.date) } },
                "transactions": { "$sum": 1 },
                "revenue": { "$sum": field(&columns.amount) },
            }
        },
        doc! { "$sort": { "_id": 1 } },
        doc! {
            "$project": {
                "_id": 0,
                "date": "$_id",
                "transactions": 1,
                "revenue": { "$round": ["$revenue", 2] },
            }
        },
    ]
}

fn top_products_pipeline(columns: &ColumnMap, start: bson::DateTime, limit: i64) -> Vec<Document> {
    vec![
        window_match(columns, start),
        doc! {
            "$group": {
                "_id": field(&columns.product),
                "sales": { "$sum": { "$ifNull": [field(&columns.items), 1] } },
            }
        },
        doc! { "$sort": { "sales": -1, "_id": 1 } },
        doc! { "$limit": limit },
        doc! { "$project": { "_id": 0, "name": "$_id", "sales": 1 } },
    ]
}

fn recent_pipeline(columns: &ColumnMap) -> Vec<Document> {
    let date = columns.date.as_str();
    vec![
        doc! { "$sort": { date: -1 } },
        doc! { "$limit": RECENT_LIMIT as i64 },
        doc! {
            "$project": {
                "_id": 0,
                "id": { "$toString": field(&columns.id) },
                "store": field(&columns.store),
                "amount": field(&columns.amount),
                "items": field(&columns.items),
                "date": {
                    "$dateToString": { "format": "%Y-%m-%d %H:%M", "date": field(&columns.date) }
                },
                "status": field(&columns.status),
            }
        },
    ]
}

/// Field names are interpolated into pipelines, so operators and paths are rejected
/// Commands accepted as native statements
const READ_COMMANDS: &[&str] = &[
    "find",
    "aggregate",
    "count",
    "distinct",
    "listCollections",
    "collStats",
];

/// Allow only read commands, and aggregations that do not write
fn check_read_only(doc: &Document) -> std::result::Result<(), String> {
    let Some(command) = doc.keys().next() else {
        return Err("MongoDB statement is an empty document".to_string());
    };
    if !READ_COMMANDS.contains(&command.as_str()) {
        return Err(format!(
            "MongoDB command '{}' is not allowed; use one of: {}",
            command,
            READ_COMMANDS.join(", ")
        ));
    }
    if command == "aggregate" {
        let stages = doc.get_array("pipeline").map_err(|_| "aggregate needs a 'pipeline' array")?;
        let writes = stages.iter().any(|stage| {
            matches!(
                stage,
                Bson::Document(stage) if stage.contains_key("$out") || stage.contains_key("$merge")
            )
        });
        if writes {
            return Err("aggregate stages $out and $merge are not allowed".to_string());
        }
    }
    Ok(())
}

fn check_fields(columns: &ColumnMap) -> std::result::Result<(), String> {
    for name in [
        &columns.id,
        &columns.date,
        &columns.amount,
        &columns.product,
        &columns.store,
        &columns.items,
        &columns.status,
    ] {
        if name.is_empty() || name.starts_with('$') || name.contains('\0') {
            return Err(format!("invalid field name '{}'", name));
        }
    }
    Ok(())
}

/// Failure kind for a server command error code name
fn failure_for_code_name(code_name: &str) -> QueryFailure {
    match code_name {
        "BadValue" | "FailedToParse" | "TypeMismatch" | "InvalidOptions" | "CommandNotFound"
        | "InvalidPipelineOperator" | "InvalidNamespace" | "NamespaceNotFound" => {
            QueryFailure::Malformed
        }
        "HostUnreachable" | "HostNotFound" | "NetworkTimeout" | "ShutdownInProgress"
        | "NotWritablePrimary" | "PrimarySteppedDown" => QueryFailure::Unreachable,
        _ => QueryFailure::Backend,
    }
}

fn classify(e: MongoError) -> RetailscopeError {
    let kind = match e.kind.as_ref() {
        ErrorKind::ServerSelection { .. }
        | ErrorKind::Io(_)
        | ErrorKind::ConnectionPoolCleared { .. }
        | ErrorKind::DnsResolve { .. } => QueryFailure::Unreachable,
        ErrorKind::InvalidArgument { .. } | ErrorKind::BsonSerialization(_) => {
            QueryFailure::Malformed
        }
        ErrorKind::Command(command) => failure_for_code_name(&command.code_name),
        _ => QueryFailure::Backend,
    };
    RetailscopeError::Query {
        kind,
        message: format!("MongoDB query failed: {}", e),
    }
}

fn document_to_row(doc: &Document) -> Record {
    let mut map = HashMap::new();
    for (k, v) in doc {
        map.insert(k.clone(), bson_to_json(v.clone()));
    }
    map
}

/// Convert a run_command result document to rows (cursor.firstBatch or single row).
fn result_to_rows(result: Document) -> Vec<Record> {
    if let Some(cursor_bson) = result.get("cursor").and_then(|c| c.as_document()) {
        if let Some(Bson::Array(batch)) = cursor_bson.get("firstBatch") {
            return batch
                .iter()
                .filter_map(|v| v.as_document())
                .map(document_to_row)
                .collect();
        }
    }
    vec![document_to_row(&result)]
}

fn bson_to_json(bson: Bson) -> serde_json::Value {
    match bson {
        Bson::ObjectId(oid) => serde_json::Value::String(oid.to_hex()),
        Bson::DateTime(dt) => serde_json::Value::String(
            chrono::DateTime::from_timestamp_millis(dt.timestamp_millis())
                .map(|d| d.to_rfc3339())
                .unwrap_or_else(|| dt.to_string()),
        ),
        Bson::Document(doc) => {
            let mut m = serde_json::Map::new();
            for (key, value) in doc {
                m.insert(key, bson_to_json(value));
            }
            serde_json::Value::Object(m)
        }
        Bson::Array(arr) => serde_json::Value::Array(arr.into_iter().map(bson_to_json).collect()),
        Bson::Decimal128(d) => serde_json::Value::String(d.to_string()),
        other => bson::from_bson(other).unwrap_or(serde_json::Value::Null),
    }
}

#[async_trait]
impl Connector for MongoDbConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<()> {
        let Some(attempt) = self.lifecycle.begin_connect().await else {
            return Ok(());
        };

        let options: MongoOptions = config.options_as().map_err(|e| {
            RetailscopeError::connection_failed("Invalid MongoDB options", config, e)
        })?;
        check_fields(&options.columns)
            .map_err(|e| {
                RetailscopeError::connection_failed("Invalid MongoDB options", config, e)
            })?;

        let mut client_options = ClientOptions::parse(&options.url).await.map_err(|e| {
            RetailscopeError::connection_failed("MongoDB options parse failed", config, e)
        })?;
        client_options.min_pool_size = client_options.min_pool_size.or(Some(1));
        client_options.max_pool_size = client_options.max_pool_size.or(Some(10));
        if let Some(timeout) = config.timeout() {
            client_options.server_selection_timeout = Some(timeout);
            client_options.connect_timeout = Some(timeout);
        }

        let client = Client::with_options(client_options).map_err(|e| {
            RetailscopeError::connection_failed("MongoDB client creation failed", config, e)
        })?;

        let database = match options.database.as_deref() {
            Some(name) => client.database(name),
            None => client.default_database().ok_or_else(|| {
                RetailscopeError::connection_failed(
                    "Invalid MongoDB options",
                    config,
                    "no database in options or connection string",
                )
            })?,
        };

        // The driver connects lazily; ping so bad hosts fail here
        database
            .run_command(doc! { "ping": 1 }, None)
            .await
            .map_err(|e| {
                RetailscopeError::connection_failed("MongoDB connection failed", config, e)
            })?;

        info!(
            "Connected to MongoDB for '{}' ({}.{})",
            config.id,
            database.name(),
            options.collection
        );
        *self.session.write() = Some(MongoSession {
            database,
            collection: options.collection,
            columns: options.columns,
            label: config.label_or("MongoDB"),
        });

        attempt.succeed();
        Ok(())
    }

    async fn test_connection(&self) -> ConnectionTest {
        let session = match self.session() {
            Ok(session) => session,
            Err(e) => return ConnectionTest::failed(e.to_string()),
        };

        match session.database.run_command(doc! { "ping": 1 }, None).await {
            Ok(_) => ConnectionTest::ok("MongoDB is reachable").with_details(serde_json::json!({
                "database": session.database.name(),
                "collection": session.collection,
            })),
            Err(e) => ConnectionTest::failed(format!("MongoDB health check failed: {}", e)),
        }
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        let session = self.session()?;
        let started = Instant::now();

        let data = match request {
            QueryRequest::Named { name, .. } => session.dashboard(*name, request.days()).await?,
            QueryRequest::Native { statement } => session.run_command(statement).await?,
        };
        debug!("MongoDB {} returned {} rows", request.label(), data.len());

        Ok(QueryResult::new(
            data,
            session.label.clone(),
            started.elapsed().as_millis() as u64,
        ))
    }

    async fn get_tables(&self) -> Result<Vec<TableInfo>> {
        let session = self.session()?;
        let mut names = session
            .database
            .list_collection_names(None)
            .await
            .map_err(classify)?;
        names.sort();

        let mut tables = Vec::with_capacity(names.len());
        for name in names {
            let row_count = session
                .database
                .collection::<Document>(&name)
                .estimated_document_count(None)
                .await
                .ok();
            tables.push(TableInfo { name, row_count });
        }
        Ok(tables)
    }

    async fn get_table_schema(&self, table: &str) -> Result<TableSchema> {
        let session = self.session()?;
        let docs = session
            .aggregate(table, vec![doc! { "$sample": { "size": SCHEMA_SAMPLE } }])
            .await?;
        let rows: Vec<Record> = docs.iter().map(document_to_row).collect();
        Ok(TableSchema::infer(table, &rows))
    }

    async fn disconnect(&self) {
        let Some(_attempt) = self.lifecycle.begin_disconnect().await else {
            return;
        };
        if self.session.write().take().is_some() {
            info!("MongoDB client released");
        }
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
            remote: true,
        }
    }

    fn connector_type(&self) -> &'static str {
        "mongodb"
    }
}
