//! Query command implementation

use clap::Args;
use retailscope_core::RetailscopeError;
use retailscope_runtime::handlers::NATIVE_QUERY;
use retailscope_runtime::Runtime;
use retailscope_types::runtime::QueryResponse;
use retailscope_types::{QueryName, QueryRequest};
use std::str::FromStr;
use tracing::info;

use super::load_config;

/// Query command arguments
#[derive(Args, Debug)]
pub struct QueryCommand {
    /// Query to run: kpis, transactions, trends, top-products or native
    pub name: String,

    /// Window length in days for windowed queries
    #[arg(short, long)]
    pub days: Option<u32>,

    /// Data source id (defaults to the default data source)
    #[arg(short, long)]
    pub source: Option<String>,

    /// Backend-native statement, required by `native`
    #[arg(long)]
    pub statement: Option<String>,
}

impl QueryCommand {
    /// Execute the query command
    pub async fn execute(&self, config_path: &str) -> Result<(), RetailscopeError> {
        let request = self.request()?;
        let config = load_config(config_path)?;
        let runtime = Runtime::new(config).await?;

        info!(
            "Running {} against {}",
            request.label(),
            self.source.as_deref().unwrap_or("the default data source")
        );
        let result = runtime
            .manager()
            .query_with_fallback(self.source.as_deref(), &request)
            .await;
        runtime.shutdown().await;

        let response = QueryResponse::success(result?);
        println!("{}", serde_json::to_string_pretty(&response)?);
        Ok(())
    }

    fn request(&self) -> Result<QueryRequest, RetailscopeError> {
        if self.name.eq_ignore_ascii_case(NATIVE_QUERY) {
            return match self.statement.as_deref().map(str::trim) {
                Some(statement) if !statement.is_empty() => Ok(QueryRequest::native(statement)),
                _ => Err(RetailscopeError::Validation(
                    "The native query needs --statement".to_string(),
                )),
            };
        }
        let name = QueryName::from_str(&self.name).map_err(RetailscopeError::Validation)?;
        Ok(QueryRequest::named(name, self.days))
    }
}
