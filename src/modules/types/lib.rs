//! Type definitions for Retailscope
//!
//! Shared value types used across the Retailscope workspace: the logical query
//! vocabulary, the normalized query result, introspection shapes and the HTTP
//! request/response bodies.

pub mod connection;
pub mod field;
pub mod query;
pub mod result;
pub mod runtime;
pub mod schema;

pub use connection::{Capabilities, ConnectionTest};
pub use field::FieldType;
pub use query::{clamp_days, QueryName, QueryRequest, DEFAULT_DAYS, MAX_DAYS};
pub use result::{QueryMetadata, QueryResult, Record};
pub use schema::{ColumnInfo, DataSourceSchema, TableInfo, TableSchema};
