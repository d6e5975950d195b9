//! Statement building and error mapping shared by the SQL connectors

use once_cell::sync::Lazy;
use regex::Regex;
use retailscope_core::{PoolConfig, QueryFailure, Result, RetailscopeError};
use retailscope_types::{FieldType, QueryName, QueryRequest};
use serde::Deserialize;
use std::collections::HashMap;
use std::str::FromStr;

use crate::dataset::aggregate::{RECENT_LIMIT, TOP_PRODUCTS_LIMIT};
use crate::dataset::ColumnMap;

/// `days` placeholder accepted in canned and overridden statements
pub(crate) const DAYS_TOKEN: &str = "{days}";

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)?$").expect("Invalid regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dialect {
    Postgres,
    MySql,
}

impl Dialect {
    fn scheme(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
        }
    }

    fn default_port(&self) -> u16 {
        match self {
            Dialect::Postgres => 5432,
            Dialect::MySql => 3306,
        }
    }

    /// Quote a (possibly schema-qualified) identifier
    fn quote(&self, ident: &str) -> String {
        let q = match self {
            Dialect::Postgres => '"',
            Dialect::MySql => '`',
        };
        ident
            .split('.')
            .map(|part| format!("{q}{part}{q}"))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn float(&self) -> &'static str {
        match self {
            Dialect::Postgres => "DOUBLE PRECISION",
            Dialect::MySql => "DOUBLE",
        }
    }

    fn integer(&self) -> &'static str {
        match self {
            Dialect::Postgres => "BIGINT",
            Dialect::MySql => "SIGNED",
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Dialect::Postgres => "TEXT",
            Dialect::MySql => "CHAR",
        }
    }

    fn format_day(&self, column: &str) -> String {
        match self {
            Dialect::Postgres => format!("to_char({}, 'YYYY-MM-DD')", column),
            Dialect::MySql => format!("DATE_FORMAT({}, '%Y-%m-%d')", column),
        }
    }

    fn format_minute(&self, column: &str) -> String {
        match self {
            Dialect::Postgres => format!("to_char({}, 'YYYY-MM-DD HH24:MI')", column),
            Dialect::MySql => format!("DATE_FORMAT({}, '%Y-%m-%d %H:%i')", column),
        }
    }

    /// First day of the window ending on the day of the latest transaction
    fn window_start(&self, table: &str, date: &str) -> String {
        match self {
            Dialect::Postgres => format!(
                "date_trunc('day', (SELECT MAX({date}) FROM {table})) \
                 - (CAST({DAYS_TOKEN} AS INTEGER) - 1) * INTERVAL '1 day'"
            ),
            Dialect::MySql => format!(
                "DATE_SUB(DATE((SELECT MAX({date}) FROM {table})), INTERVAL ({DAYS_TOKEN} - 1) DAY)"
            ),
        }
    }
}

/// Options shared by the postgres and mysql connectors
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SqlOptions {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default, alias = "username")]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub pool: Option<PoolConfig>,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default)]
    pub columns: ColumnMap,
    /// Statement overrides per logical query
    #[serde(default)]
    pub queries: HashMap<String, String>,
}

fn default_table() -> String {
    "transactions".to_string()
}

impl SqlOptions {
    /// Connection URL, from `url` or assembled from the individual parts
    pub fn connection_url(&self, dialect: Dialect) -> std::result::Result<String, String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        let host = self.host.as_deref().ok_or("either 'url' or 'host' is required")?;
        let database = self
            .database
            .as_deref()
            .ok_or("'database' is required when 'url' is not set")?;
        let credentials = match (&self.user, &self.password) {
            (Some(user), Some(password)) => format!("{}:{}@", user, password),
            (Some(user), None) => format!("{}@", user),
            _ => String::new(),
        };
        Ok(format!(
            "{}://{}{}:{}/{}",
            dialect.scheme(),
            credentials,
            host,
            self.port.unwrap_or_else(|| dialect.default_port()),
            database
        ))
    }

    /// Pool settings for this source
    pub fn pool(&self) -> PoolConfig {
        self.pool.clone().unwrap_or_default()
    }

    /// Validated, parsed statement overrides
    pub fn overrides(&self) -> std::result::Result<HashMap<QueryName, String>, String> {
        self.queries
            .iter()
            .map(|(name, sql)| QueryName::from_str(name).map(|name| (name, sql.clone())))
            .collect()
    }

    /// Reject table/column names that cannot be safely interpolated
    pub fn check_identifiers(&self) -> std::result::Result<(), String> {
        let columns = &self.columns;
        for ident in [
            &self.table,
            &columns.id,
            &columns.date,
            &columns.amount,
            &columns.product,
            &columns.store,
            &columns.items,
            &columns.status,
        ] {
            if !IDENTIFIER.is_match(ident) {
                return Err(format!("invalid SQL identifier '{}'", ident));
            }
        }
        Ok(())
    }
}

/// A statement with its `days` placeholders resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Statement {
    pub sql: String,
    /// Number of `days` values to bind, in order
    pub binds: usize,
}

impl Statement {
    /// Replace each `{days}` token with the dialect's placeholder
    pub fn render(dialect: Dialect, template: &str) -> Self {
        let binds = template.matches(DAYS_TOKEN).count();
        let sql = match dialect {
            Dialect::Postgres => template.replace(DAYS_TOKEN, "$1"),
            Dialect::MySql => template.replace(DAYS_TOKEN, "?"),
        };
        let binds = match dialect {
            Dialect::Postgres => binds.min(1),
            Dialect::MySql => binds,
        };
        Self { sql, binds }
    }
}

/// Canned statement for a logical query over the transactions table
pub(crate) fn canned(dialect: Dialect, name: QueryName, options: &SqlOptions) -> String {
    let c = &options.columns;
    let table = dialect.quote(&options.table);
    let id = dialect.quote(&c.id);
    let date = dialect.quote(&c.date);
    let amount = dialect.quote(&c.amount);
    let product = dialect.quote(&c.product);
    let store = dialect.quote(&c.store);
    let items = dialect.quote(&c.items);
    let status = dialect.quote(&c.status);
    let alias = |name: &str| dialect.quote(name);
    let float = dialect.float();
    let window = format!(
        "WITH w AS (SELECT * FROM {table} WHERE {date} >= {start})",
        start = dialect.window_start(&table, &date)
    );

    match name {
        QueryName::Kpis => format!(
            "{window} SELECT \
             CAST(COALESCE(SUM({amount}), 0) AS {float}) AS {revenue}, \
             COUNT(*) AS {count}, \
             CAST(COALESCE(AVG({amount}), 0) AS {float}) AS {basket}, \
             (SELECT {product} FROM w GROUP BY {product} \
             ORDER BY SUM({items}) DESC, {product} LIMIT 1) AS {top}, \
             COUNT(DISTINCT {store}) AS {stores} \
             FROM w",
            revenue = alias("totalRevenue"),
            count = alias("transactionCount"),
            basket = alias("avgBasketSize"),
            top = alias("topProduct"),
            stores = alias("storeCount"),
        ),
        QueryName::Trends => format!(
            "{window} SELECT {day} AS {date_alias}, COUNT(*) AS {tx}, \
             CAST(COALESCE(SUM({amount}), 0) AS {float}) AS {revenue} \
             FROM w GROUP BY {day} ORDER BY {day}",
            day = dialect.format_day(&date),
            date_alias = alias("date"),
            tx = alias("transactions"),
            revenue = alias("revenue"),
        ),
        QueryName::TopProducts => format!(
            "{window} SELECT {product} AS {name_alias}, \
             CAST(SUM({items}) AS {integer}) AS {sales} \
             FROM w GROUP BY {product} \
             ORDER BY SUM({items}) DESC, {product} LIMIT {TOP_PRODUCTS_LIMIT}",
            integer = dialect.integer(),
            name_alias = alias("name"),
            sales = alias("sales"),
        ),
        QueryName::Transactions => format!(
            "SELECT CAST({id} AS {text}) AS {id_alias}, {store} AS {store_alias}, \
             CAST({amount} AS {float}) AS {amount_alias}, {items} AS {items_alias}, \
             {minute} AS {date_alias}, {status} AS {status_alias} \
             FROM {table} ORDER BY {date} DESC LIMIT {RECENT_LIMIT}",
            text = dialect.text(),
            minute = dialect.format_minute(&date),
            id_alias = alias("id"),
            store_alias = alias("store"),
            amount_alias = alias("amount"),
            items_alias = alias("items"),
            date_alias = alias("date"),
            status_alias = alias("status"),
        ),
    }
}

/// Statement for a request: an override, a canned query, or a read-only native statement
pub(crate) fn statement_for(
    dialect: Dialect,
    request: &QueryRequest,
    options: &SqlOptions,
    overrides: &HashMap<QueryName, String>,
) -> Result<Statement> {
    match request {
        QueryRequest::Named { name, .. } => {
            let template = overrides
                .get(name)
                .cloned()
                .unwrap_or_else(|| canned(dialect, *name, options));
            Ok(Statement::render(dialect, &template))
        }
        QueryRequest::Native { statement } => {
            let trimmed = statement.trim().trim_end_matches(';');
            let head = trimmed
                .split_whitespace()
                .next()
                .unwrap_or_default()
                .to_uppercase();
            if head != "SELECT" && head != "WITH" {
                return Err(RetailscopeError::malformed(
                    "Only SELECT statements are allowed",
                ));
            }
            Ok(Statement {
                sql: trimmed.to_string(),
                binds: 0,
            })
        }
    }
}

/// Kind of failure for a SQLSTATE code; class 42 covers syntax and unknown objects
pub(crate) fn failure_for_sqlstate(code: Option<&str>) -> QueryFailure {
    match code {
        Some(code) if code.starts_with("42") || code.starts_with("22") => QueryFailure::Malformed,
        Some(code) if code.starts_with("08") => QueryFailure::Unreachable,
        _ => QueryFailure::Backend,
    }
}

/// Map a sqlx error onto the connector error kinds
pub(crate) fn classify(backend: &str, e: sqlx::Error) -> RetailscopeError {
    let kind = match &e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed => QueryFailure::Unreachable,
        sqlx::Error::Database(db) => failure_for_sqlstate(db.code().as_deref()),
        sqlx::Error::ColumnNotFound(_) | sqlx::Error::ColumnIndexOutOfBounds { .. } => {
            QueryFailure::Malformed
        }
        _ => QueryFailure::Backend,
    };
    RetailscopeError::Query {
        kind,
        message: format!("{} query failed: {}", backend, e),
    }
}

/// Column type reported by information_schema, as a field type
pub(crate) fn field_type_for(data_type: &str) -> FieldType {
    let data_type = data_type.trim().to_lowercase();
    if data_type.ends_with("[]") {
        return FieldType::Array;
    }
    let base = data_type
        .split(|c: char| !c.is_ascii_alphanumeric())
        .next()
        .unwrap_or_default();
    match base {
        "smallint" | "integer" | "int" | "bigint" | "tinyint" | "mediumint" | "int2" | "int4"
        | "int8" | "serial" | "bigserial" | "year" => FieldType::Integer,
        "numeric" | "decimal" | "double" | "float" | "real" | "float4" | "float8" | "money" => {
            FieldType::Number
        }
        "boolean" | "bool" | "bit" => FieldType::Boolean,
        "json" | "jsonb" => FieldType::Object,
        "array" => FieldType::Array,
        _ => FieldType::String,
    }
}
