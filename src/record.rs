use chrono::{DateTime, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One price observation as served by the data service.
///
/// Wire names are the upstream French ones; `year` is carried as-is and never
/// re-derived from `date`.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Record {
    #[serde(rename = "date")]
    pub date: String,

    #[serde(rename = "produit")]
    pub product: String,

    #[serde(rename = "prix")]
    pub price: f64,

    #[serde(rename = "unite")]
    pub unit: String,

    #[serde(rename = "marche")]
    pub market: String,

    #[serde(rename = "annee")]
    pub year: i32,
}

impl Record {
    /// Calendar date of the observation, if the wire string is readable.
    ///
    /// Accepts `YYYY-MM-DD` and full RFC 3339 timestamps.
    pub fn calendar_date(&self) -> Option<NaiveDate> {
        parse_date(&self.date)
    }

    /// Date as `dd/mm/yyyy`, falling back to the raw string.
    pub fn localized_date(&self) -> String {
        match self.calendar_date() {
            Some(date) => date.format("%d/%m/%Y").to_string(),
            None => self.date.clone(),
        }
    }

    /// Price with two decimals, e.g. `1.13` for 1.125
    pub fn price_2dp(&self) -> String {
        two_decimals(self.price)
    }
}

/// Two-decimal rendering where exact halves round away from zero.
///
/// Works on the exact binary value: `1.125` gives `1.13`, while `1.005` (stored
/// just below the half) gives `1.00`.
pub fn two_decimals(value: f64) -> String {
    match Decimal::from_f64_retain(value) {
        Some(exact) => {
            let rounded = exact.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
            format!("{:.2}", rounded)
        }
        None => format!("{:.2}", value),
    }
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

// ============================================================================
// RECORD STORE
// ============================================================================

/// In-memory record set, replaced wholesale on every successful load.
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    records: Vec<Record>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Swap in a freshly loaded record set. Never patched incrementally.
    pub fn replace(&mut self, records: Vec<Record>) {
        self.records = records;
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Distinct years present, most recent first (year selector options)
    pub fn available_years(&self) -> Vec<i32> {
        let years: BTreeSet<i32> = self.records.iter().map(|r| r.year).collect();
        years.into_iter().rev().collect()
    }

    /// Distinct markets present, alphabetical (market selector options)
    pub fn available_markets(&self) -> Vec<String> {
        let markets: BTreeSet<&str> = self.records.iter().map(|r| r.market.as_str()).collect();
        markets.into_iter().map(str::to_string).collect()
    }
}

#[cfg(test)]
pub(crate) fn sample_record(date: &str, product: &str, price: f64, market: &str, year: i32) -> Record {
    Record {
        date: date.to_string(),
        product: product.to_string(),
        price,
        unit: "kg".to_string(),
        market: market.to_string(),
        year,
    }
}
