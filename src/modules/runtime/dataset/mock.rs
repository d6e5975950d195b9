//! Deterministic mock retail dataset backing the memory connector

use chrono::{Duration, NaiveDate, NaiveTime};

use super::aggregate::Transaction;

/// Days of history generated
pub const MOCK_DAYS: u32 = 90;

/// Products and unit prices (PHP)
const PRODUCTS: &[(&str, f64)] = &[
    ("Alaska Evaporated Milk", 42.50),
    ("Oishi Prawn Crackers", 18.75),
    ("Del Monte Tomato Sauce", 35.00),
    ("Champion Detergent Bar", 24.25),
    ("Alaska Condensed Milk", 48.00),
    ("Pride Dishwashing Liquid", 65.50),
    ("Del Monte Sweet Style Spaghetti Sauce", 79.90),
    ("Oishi Potato Chips", 28.00),
    ("Alaska Fresh Milk", 95.00),
    ("Champion Liquid Detergent", 139.75),
];

const STORES: &[&str] = &[
    "Manila",
    "Quezon City",
    "Makati",
    "Cebu City",
    "Davao City",
    "Taguig",
    "Iloilo City",
    "Pampanga",
    "Alabang",
    "Pasay City",
];

const SEED: u64 = 0x5eed_2024;

/// Small LCG so the dataset is identical across runs
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, bound: u64) -> u64 {
        self.next() % bound
    }
}

/// Generate `MOCK_DAYS` of transactions ending on `today`
pub fn transactions(today: NaiveDate) -> Vec<Transaction> {
    let mut rng = Lcg(SEED);
    let mut out = Vec::new();
    let mut seq = 0u32;

    for offset in (0..MOCK_DAYS).rev() {
        let day = today - Duration::days(i64::from(offset));
        let per_day = 30 + rng.below(20);

        for _ in 0..per_day {
            seq += 1;
            // Two draws skew sales toward the front of the product list
            let product = rng.below(PRODUCTS.len() as u64).min(rng.below(PRODUCTS.len() as u64));
            let (name, price) = PRODUCTS[product as usize];
            let items = 1 + rng.below(8) as u32;
            let store = STORES[rng.below(STORES.len() as u64) as usize];
            let time = NaiveTime::from_hms_opt(8 + rng.below(13) as u32, rng.below(60) as u32, 0)
                .unwrap_or(NaiveTime::MIN);
            let status = if rng.below(10) == 0 {
                "Processing"
            } else {
                "Completed"
            };

            out.push(Transaction {
                id: format!("TBWA{:06}", seq),
                store: store.to_string(),
                product: name.to_string(),
                amount: (price * f64::from(items) * 100.0).round() / 100.0,
                items,
                date: day.and_time(time),
                status: status.to_string(),
            });
        }
    }

    out
}

/// Product names in catalog order
pub fn products() -> impl Iterator<Item = &'static str> {
    PRODUCTS.iter().map(|(name, _)| *name)
}
