//! REST API connector

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use retailscope_core::{ConnectionConfig, ConnectorMetadata, Result, RetailscopeError};
use retailscope_types::{
    Capabilities, ConnectionTest, FieldType, QueryName, QueryRequest, QueryResult, Record,
    TableInfo, TableSchema,
};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use super::lifecycle::Lifecycle;
use super::traits::Connector;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Deserialize)]
struct RestOptions {
    base_url: String,
    #[serde(default)]
    auth: Option<RestAuth>,
    #[serde(default)]
    headers: HashMap<String, String>,
    /// Logical query name to path; when set, only these queries are served
    #[serde(default)]
    endpoints: HashMap<String, String>,
    #[serde(default = "default_health_path")]
    health_path: String,
    /// JSON pointer to the rows inside the response body
    #[serde(default)]
    data_path: Option<String>,
}

fn default_health_path() -> String {
    "/health".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RestAuth {
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        #[serde(default)]
        password: Option<String>,
    },
    #[serde(alias = "apiKey")]
    ApiKey {
        #[serde(default = "default_api_key_header")]
        header: String,
        #[serde(alias = "apiKey", alias = "key")]
        api_key: String,
    },
}

fn default_api_key_header() -> String {
    "x-api-key".to_string()
}

struct RestSession {
    client: Client,
    /// Always ends with `/` so joined paths stay under it
    base_url: Url,
    auth: Option<RestAuth>,
    endpoints: HashMap<QueryName, String>,
    health_path: String,
    data_path: Option<String>,
    label: String,
}

impl RestSession {
    /// Resolve a path against the base URL; anything leaving its origin is rejected
    fn url(&self, path: &str) -> Result<Url> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| RetailscopeError::malformed(format!("Invalid path '{}': {}", path, e)))?;
        if !same_origin(&url, &self.base_url) {
            return Err(RetailscopeError::malformed(format!(
                "Path '{}' resolves outside the configured base_url",
                path
            )));
        }
        Ok(url)
    }

    fn get(&self, path: &str) -> Result<RequestBuilder> {
        let builder = self.client.get(self.url(path)?);
        Ok(match &self.auth {
            None => builder,
            Some(RestAuth::Bearer { token }) => builder.bearer_auth(token),
            Some(RestAuth::Basic { username, password }) => {
                builder.basic_auth(username, password.as_ref())
            }
            Some(RestAuth::ApiKey { header, api_key }) => {
                builder.header(header.as_str(), api_key.as_str())
            }
        })
    }

    /// Path for a logical query; `None` when the endpoint map excludes it
    fn path_for(&self, name: QueryName) -> Option<String> {
        if self.endpoints.is_empty() {
            Some(format!("/{}", name.as_str()))
        } else {
            self.endpoints.get(&name).cloned()
        }
    }

    fn supported(&self) -> Vec<QueryName> {
        QueryName::all()
            .iter()
            .copied()
            .filter(|name| self.path_for(*name).is_some())
            .collect()
    }
}

/// Connector for JSON HTTP APIs
pub struct RestApiConnector {
    lifecycle: Lifecycle,
    session: RwLock<Option<Arc<RestSession>>>,
}

impl RestApiConnector {
    pub fn new() -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            session: RwLock::new(None),
        }
    }

    /// Registry metadata for the `rest-api` type
    pub fn describe() -> ConnectorMetadata {
        ConnectorMetadata::new("rest-api", "REST API")
            .with_description("Dashboard data served by a JSON HTTP API")
            .with_icon("cloud")
            .required("base_url", FieldType::String, "Base URL of the REST API")
            .optional("auth", FieldType::Object, "Authentication: bearer, basic or api_key")
            .optional("headers", FieldType::Object, "Additional headers to send with requests")
            .optional("endpoints", FieldType::Object, "Path per logical query (default /<query>)")
            .optional(
                "health_path",
                FieldType::String,
                "Path used by the connection test (default /health)",
            )
            .optional("data_path", FieldType::String, "JSON pointer to the rows in the response")
    }

    fn session(&self) -> Result<Arc<RestSession>> {
        match self.session.read().as_ref() {
            Some(session) if self.lifecycle.is_connected() => Ok(session.clone()),
            _ => Err(RetailscopeError::connection("REST data source is not connected")),
        }
    }

    async fn fetch(&self, session: &RestSession, request: RequestBuilder) -> Result<Vec<Record>> {
        let response = request.send().await.map_err(classify_send_error)?;
        let status = response.status();
        let url = response.url().to_string();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, &url, &body));
        }

        let body: Value = response.json().await.map_err(|e| {
            RetailscopeError::backend(format!("Invalid JSON from {}: {}", url, e))
        })?;
        debug!("GET {} returned {}", url, status);
        rows_from_body(body, session.data_path.as_deref())
    }
}

impl Default for RestApiConnector {
    fn default() -> Self {
        Self::new()
    }
}

fn same_origin(a: &Url, b: &Url) -> bool {
    a.scheme() == b.scheme()
        && a.host_str() == b.host_str()
        && a.port_or_known_default() == b.port_or_known_default()
}

/// Parse `base_url` as an http(s) base that relative paths can be joined onto
fn parse_base_url(raw: &str) -> std::result::Result<Url, String> {
    let mut url = Url::parse(raw).map_err(|e| e.to_string())?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(format!("'{}' is not an http(s) URL", raw));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn classify_send_error(e: reqwest::Error) -> RetailscopeError {
    if e.is_builder() {
        RetailscopeError::malformed(format!("Invalid request: {}", e))
    } else {
        RetailscopeError::unreachable(format!("Request failed: {}", e))
    }
}

fn classify_status(status: StatusCode, url: &str, body: &str) -> RetailscopeError {
    let snippet: String = body.chars().take(200).collect();
    let message = format!("{} returned {}: {}", url, status, snippet);
    match status {
        StatusCode::BAD_REQUEST | StatusCode::NOT_FOUND | StatusCode::UNPROCESSABLE_ENTITY => {
            RetailscopeError::malformed(message)
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => RetailscopeError::unreachable(message),
        _ => RetailscopeError::backend(message),
    }
}

/// Rows from a JSON body: an array of objects, `{ "data": [...] }`, or a single object
fn rows_from_body(body: Value, data_path: Option<&str>) -> Result<Vec<Record>> {
    let value = match data_path {
        Some(pointer) => body.pointer(pointer).cloned().ok_or_else(|| {
            RetailscopeError::backend(format!("Response has no value at '{}'", pointer))
        })?,
        None => match body {
            Value::Object(mut map) if matches!(map.get("data"), Some(Value::Array(_))) => {
                map.remove("data").unwrap_or(Value::Null)
            }
            other => other,
        },
    };

    Ok(match value {
        Value::Array(items) => items.into_iter().map(into_record).collect(),
        Value::Null => Vec::new(),
        other => vec![into_record(other)],
    })
}

fn into_record(value: Value) -> Record {
    match value {
        Value::Object(map) => map.into_iter().collect(),
        other => std::iter::once(("value".to_string(), other)).collect(),
    }
}

fn build_headers(headers: &HashMap<String, String>) -> std::result::Result<HeaderMap, String> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| format!("invalid header name '{}': {}", name, e))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| format!("invalid value for header '{}': {}", name, e))?;
        map.insert(name, value);
    }
    Ok(map)
}

#[async_trait]
impl Connector for RestApiConnector {
    async fn connect(&self, config: &ConnectionConfig) -> Result<()> {
        let Some(attempt) = self.lifecycle.begin_connect().await else {
            return Ok(());
        };

        let options: RestOptions = config
            .options_as()
            .map_err(|e| RetailscopeError::connection_failed("Invalid REST options", config, e))?;

        let base_url = parse_base_url(&options.base_url).map_err(|e| {
            RetailscopeError::connection_failed("Invalid REST base_url", config, e)
        })?;

        let mut endpoints = HashMap::new();
        for (name, path) in &options.endpoints {
            let name = QueryName::from_str(name)
                .map_err(|e| {
                    RetailscopeError::connection_failed("Invalid REST endpoints", config, e)
                })?;
            endpoints.insert(name, path.clone());
        }

        let headers = build_headers(&options.headers)
            .map_err(|e| RetailscopeError::connection_failed("Invalid REST headers", config, e))?;

        let client = Client::builder()
            .timeout(config.timeout().unwrap_or(DEFAULT_TIMEOUT))
            .default_headers(headers)
            .user_agent(format!("retailscope/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                RetailscopeError::connection_failed("Cannot build HTTP client", config, e)
            })?;

        *self.session.write() = Some(Arc::new(RestSession {
            client,
            base_url,
            auth: options.auth,
            endpoints,
            health_path: options.health_path,
            data_path: options.data_path,
            label: config.label_or("REST API"),
        }));

        attempt.succeed();
        Ok(())
    }

    async fn test_connection(&self) -> ConnectionTest {
        let session = match self.session() {
            Ok(session) => session,
            Err(e) => return ConnectionTest::failed(e.to_string()),
        };

        let builder = match session.get(&session.health_path) {
            Ok(builder) => builder,
            Err(e) => return ConnectionTest::failed(e.to_string()),
        };
        let url = session.url(&session.health_path).map(String::from).unwrap_or_default();
        match builder.send().await {
            Ok(response) if response.status().is_success() => {
                ConnectionTest::ok("API is reachable").with_details(serde_json::json!({
                    "url": url,
                    "status": response.status().as_u16(),
                }))
            }
            Ok(response) => ConnectionTest::failed(format!(
                "Health check returned {}",
                response.status()
            ))
            .with_details(serde_json::json!({ "url": url })),
            Err(e) => ConnectionTest::failed(format!("API unreachable: {}", e)),
        }
    }

    async fn query(&self, request: &QueryRequest) -> Result<QueryResult> {
        let session = self.session()?;
        let started = Instant::now();

        let builder = match request {
            QueryRequest::Named { name, .. } => {
                let path = session
                    .path_for(*name)
                    .ok_or_else(|| RetailscopeError::unsupported("rest-api", name.as_str()))?;
                let builder = session.get(&path)?;
                if name.takes_days() {
                    builder.query(&[("days", request.days())])
                } else {
                    builder
                }
            }
            QueryRequest::Native { statement } => session.get(statement.trim())?,
        };

        let rows = self.fetch(&session, builder).await?;
        Ok(QueryResult::new(
            rows,
            session.label.clone(),
            started.elapsed().as_millis() as u64,
        ))
    }

    async fn get_tables(&self) -> Result<Vec<TableInfo>> {
        let session = self.session()?;
        Ok(session
            .supported()
            .into_iter()
            .map(|name| TableInfo {
                name: name.to_string(),
                row_count: None,
            })
            .collect())
    }

    async fn get_table_schema(&self, table: &str) -> Result<TableSchema> {
        let name = QueryName::from_str(table).map_err(RetailscopeError::malformed)?;
        let result = self.query(&QueryRequest::named(name, None)).await?;
        Ok(TableSchema::infer(table, &result.data))
    }

    async fn disconnect(&self) {
        let Some(_attempt) = self.lifecycle.begin_disconnect().await else {
            return;
        };
        self.session.write().take();
    }

    fn is_connected(&self) -> bool {
        self.lifecycle.is_connected()
    }

    fn metadata(&self) -> ConnectorMetadata {
        Self::describe()
    }

    fn capabilities(&self) -> Capabilities {
        let queries = match self.session.read().as_ref() {
            Some(session) => session.supported(),
            None => QueryName::all().to_vec(),
        };
        Capabilities {
            queries,
            native_queries: true,
            introspection: true,
            remote: true,
        }
    }

    fn connector_type(&self) -> &'static str {
        "rest-api"
    }
}
