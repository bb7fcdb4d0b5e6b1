// Filter Engine - stateless selection over the record store

use crate::record::Record;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wildcard token used by the selectors and the query string
pub const ALL: &str = "all";

/// Value of a dropdown filter: everything, or one exact value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    pub fn parse(value: &str) -> Self {
        if value == ALL {
            Selection::All
        } else {
            Selection::Only(value.to_string())
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Selection::All)
    }

    fn accepts(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(expected) => expected == value,
        }
    }
}

impl From<String> for Selection {
    fn from(value: String) -> Self {
        Selection::parse(&value)
    }
}

impl From<Selection> for String {
    fn from(selection: Selection) -> Self {
        selection.to_string()
    }
}

impl fmt::Display for Selection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selection::All => f.write_str(ALL),
            Selection::Only(value) => f.write_str(value),
        }
    }
}

/// Active filter state, re-read from the inputs on every recompute.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    #[serde(default, rename = "search")]
    pub search_term: String,
    #[serde(default)]
    pub year: Selection,
    #[serde(default)]
    pub market: Selection,
}

impl FilterCriteria {
    pub fn new(search_term: &str, year: &str, market: &str) -> Self {
        Self {
            search_term: search_term.to_string(),
            year: Selection::parse(year),
            market: Selection::parse(market),
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        let matches_search = record
            .product
            .to_lowercase()
            .contains(&self.search_term.to_lowercase());
        let matches_year = self.year.accepts(&record.year.to_string());
        let matches_market = self.market.accepts(&record.market);

        matches_search && matches_year && matches_market
    }
}

/// Records matching `criteria`, in input order. Never mutates `records`.
pub fn filter(records: &[Record], criteria: &FilterCriteria) -> Vec<Record> {
    records
        .iter()
        .filter(|record| criteria.matches(record))
        .cloned()
        .collect()
}
