//! Retail transaction data shared by the memory and CSV connectors

pub mod aggregate;
pub mod mock;

pub use aggregate::{ColumnMap, Transaction};

use retailscope_types::{QueryName, Record};

/// Answer a canned dashboard query from transactions
pub fn answer(name: QueryName, transactions: &[Transaction], days: u32) -> Vec<Record> {
    match name {
        QueryName::Kpis => vec![aggregate::kpis(transactions, days)],
        QueryName::Transactions => aggregate::recent(transactions),
        QueryName::Trends => aggregate::trends(transactions, days),
        QueryName::TopProducts => aggregate::top_products(transactions, days),
    }
}
