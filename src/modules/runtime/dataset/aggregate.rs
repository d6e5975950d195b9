//! Dashboard rows derived from transaction records
//!
//! Windows end at the most recent transaction in the set, so a file exported
//! last month still produces a populated dashboard.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use retailscope_types::{clamp_days, Record};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};

/// Rows returned by the `transactions` query
pub const RECENT_LIMIT: usize = 10;

/// Rows returned by the `top-products` query
pub const TOP_PRODUCTS_LIMIT: usize = 10;

const DATE_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M"];

/// One sale
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    pub id: String,
    pub store: String,
    pub product: String,
    pub amount: f64,
    pub items: u32,
    pub date: NaiveDateTime,
    pub status: String,
}

/// Which record fields hold the transaction attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnMap {
    pub id: String,
    pub date: String,
    pub amount: String,
    pub product: String,
    pub store: String,
    pub items: String,
    pub status: String,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            id: "id".to_string(),
            date: "date".to_string(),
            amount: "amount".to_string(),
            product: "product".to_string(),
            store: "store".to_string(),
            items: "items".to_string(),
            status: "status".to_string(),
        }
    }
}

impl Transaction {
    /// Read a transaction out of a record.
    ///
    /// `date` and `amount` are required; the remaining columns have defaults.
    pub fn from_record(record: &Record, columns: &ColumnMap, index: usize) -> Option<Self> {
        let date = record.get(&columns.date).and_then(parse_date)?;
        let amount = record.get(&columns.amount).and_then(as_f64)?;

        let items = record
            .get(&columns.items)
            .and_then(as_f64)
            .map(|v| v.max(0.0) as u32)
            .unwrap_or(1);

        Some(Self {
            id: record
                .get(&columns.id)
                .and_then(as_text)
                .unwrap_or_else(|| format!("TX{:06}", index + 1)),
            store: text_or(record.get(&columns.store), "Unknown"),
            product: text_or(record.get(&columns.product), "Unknown"),
            amount,
            items,
            date,
            status: text_or(record.get(&columns.status), "Completed"),
        })
    }

    /// Record form, as stored in memory tables
    pub fn to_record(&self) -> Record {
        record([
            ("id", json!(self.id)),
            ("store", json!(self.store)),
            ("product", json!(self.product)),
            ("amount", json!(self.amount)),
            ("items", json!(self.items)),
            ("date", json!(self.date.format("%Y-%m-%dT%H:%M:%S").to_string())),
            ("status", json!(self.status)),
        ])
    }
}

/// Convert records, skipping rows without a usable date or amount
pub fn transactions_from_records<'a>(
    records: impl IntoIterator<Item = &'a Record>,
    columns: &ColumnMap,
) -> Vec<Transaction> {
    records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| Transaction::from_record(record, columns, index))
        .collect()
}

/// Headline numbers over the last `days` days
pub fn kpis(transactions: &[Transaction], days: u32) -> Record {
    let window = in_window(transactions, days);

    let total_revenue: f64 = window.iter().map(|t| t.amount).sum();
    let count = window.len();
    let avg_basket = if count == 0 {
        0.0
    } else {
        total_revenue / count as f64
    };
    let stores: HashSet<&str> = window.iter().map(|t| t.store.as_str()).collect();
    let top_product = product_sales(&window)
        .into_iter()
        .next()
        .map(|(name, _)| Value::String(name))
        .unwrap_or(Value::Null);

    record([
        ("totalRevenue", json!(round2(total_revenue))),
        ("transactionCount", json!(count)),
        ("avgBasketSize", json!(round2(avg_basket))),
        ("topProduct", top_product),
        ("storeCount", json!(stores.len())),
    ])
}

/// One row per day, oldest first; days without sales are zero-filled
pub fn trends(transactions: &[Transaction], days: u32) -> Vec<Record> {
    let Some(end) = anchor(transactions) else {
        return Vec::new();
    };
    let start = window_start(end, days);

    let mut per_day: HashMap<NaiveDate, (u64, f64)> = HashMap::new();
    for tx in transactions {
        let day = tx.date.date();
        if day >= start && day <= end {
            let entry = per_day.entry(day).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += tx.amount;
        }
    }

    let mut rows = Vec::new();
    let mut day = start;
    while day <= end {
        let (count, revenue) = per_day.get(&day).copied().unwrap_or((0, 0.0));
        rows.push(record([
            ("date", json!(day.format("%Y-%m-%d").to_string())),
            ("transactions", json!(count)),
            ("revenue", json!(round2(revenue))),
        ]));
        day += Duration::days(1);
    }
    rows
}

/// Best sellers by units over the last `days` days
pub fn top_products(transactions: &[Transaction], days: u32) -> Vec<Record> {
    let window = in_window(transactions, days);
    product_sales(&window)
        .into_iter()
        .take(TOP_PRODUCTS_LIMIT)
        .map(|(name, sales)| record([("name", json!(name)), ("sales", json!(sales))]))
        .collect()
}

/// Most recent transactions, newest first
pub fn recent(transactions: &[Transaction]) -> Vec<Record> {
    let mut sorted: Vec<&Transaction> = transactions.iter().collect();
    sorted.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| b.id.cmp(&a.id)));
    sorted
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|t| {
            record([
                ("id", json!(t.id)),
                ("store", json!(t.store)),
                ("amount", json!(round2(t.amount))),
                ("items", json!(t.items)),
                ("date", json!(t.date.format("%Y-%m-%d %H:%M").to_string())),
                ("status", json!(t.status)),
            ])
        })
        .collect()
}

fn anchor(transactions: &[Transaction]) -> Option<NaiveDate> {
    transactions.iter().map(|t| t.date.date()).max()
}

fn window_start(end: NaiveDate, days: u32) -> NaiveDate {
    let span = Duration::days(i64::from(clamp_days(days)) - 1);
    end.checked_sub_signed(span).unwrap_or(NaiveDate::MIN)
}

fn in_window(transactions: &[Transaction], days: u32) -> Vec<&Transaction> {
    let Some(end) = anchor(transactions) else {
        return Vec::new();
    };
    let start = window_start(end, days);
    transactions
        .iter()
        .filter(|t| t.date.date() >= start)
        .collect()
}

/// Units sold per product, highest first (ties by name)
fn product_sales(window: &[&Transaction]) -> Vec<(String, u64)> {
    let mut sales: HashMap<&str, u64> = HashMap::new();
    for tx in window {
        *sales.entry(tx.product.as_str()).or_insert(0) += u64::from(tx.items);
    }
    let mut ranked: Vec<(String, u64)> = sales
        .into_iter()
        .map(|(name, units)| (name.to_string(), units))
        .collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
}

pub(crate) fn record<const N: usize>(pairs: [(&str, Value); N]) -> Record {
    pairs
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect()
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn parse_date(value: &Value) -> Option<NaiveDateTime> {
    let text = value.as_str()?.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_utc());
    }
    for format in DATE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn text_or(value: Option<&Value>, default: &str) -> String {
    value
        .and_then(as_text)
        .unwrap_or_else(|| default.to_string())
}
