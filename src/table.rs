// Table Renderer - display rows for the filtered selection

use crate::record::Record;
use serde::Serialize;
use std::cmp::Ordering;

/// Shown instead of data rows when the selection is empty
pub const NO_RESULTS: &str = "Aucune donnée trouvée pour ces critères.";

/// Column headers, in display order
pub const COLUMNS: [&str; 4] = ["Date", "Produit", "Prix", "Marché"];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TableRow {
    /// Single full-width message row (no results, fetch diagnostics)
    Notice { text: String },
    Entry {
        date: String,
        product: String,
        price: String,
        market: String,
    },
}

impl TableRow {
    pub fn notice(text: &str) -> Self {
        TableRow::Notice { text: text.to_string() }
    }

    fn entry(record: &Record) -> Self {
        TableRow::Entry {
            date: record.localized_date(),
            product: record.product.clone(),
            price: format_price(record),
            market: record.market.clone(),
        }
    }

    /// Cells in column order; a notice fills the first cell only
    pub fn cells(&self) -> Vec<&str> {
        match self {
            TableRow::Notice { text } => vec![text.as_str()],
            TableRow::Entry { date, product, price, market } => {
                vec![date.as_str(), product.as_str(), price.as_str(), market.as_str()]
            }
        }
    }
}

/// `1.50 €/kg`
pub fn format_price(record: &Record) -> String {
    format!("{} €/{}", record.price_2dp(), record.unit)
}

/// Build the full table for `records`, newest first.
///
/// Sorting is stable and works on a copy, so records sharing a date keep their
/// input order. Unreadable dates go after all readable ones.
pub fn render_rows(records: &[Record]) -> Vec<TableRow> {
    if records.is_empty() {
        return vec![TableRow::notice(NO_RESULTS)];
    }

    let mut sorted: Vec<&Record> = records.iter().collect();
    sorted.sort_by(|a, b| compare_date_desc(a, b));

    sorted.into_iter().map(TableRow::entry).collect()
}

fn compare_date_desc(a: &Record, b: &Record) -> Ordering {
    match (a.calendar_date(), b.calendar_date()) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{parse_date, sample_record};

    fn dates(rows: &[TableRow]) -> Vec<String> {
        rows.iter()
            .map(|row| match row {
                TableRow::Entry { date, .. } => date.clone(),
                TableRow::Notice { text } => text.clone(),
            })
            .collect()
    }

    #[test]
    fn test_empty_input_gives_placeholder() {
        let rows = render_rows(&[]);
        assert_eq!(rows, vec![TableRow::notice(NO_RESULTS)]);
        assert_eq!(rows[0].cells(), vec![NO_RESULTS]);
    }

    #[test]
    fn test_sorted_newest_first() {
        let records = vec![
            sample_record("2023-06-01", "Corn", 2.0, "B", 2023),
            sample_record("2024-01-10", "Wheat", 1.5, "A", 2024),
            sample_record("2023-12-24", "Litchi", 8.0, "A", 2023),
        ];

        let rows = render_rows(&records);
        assert_eq!(dates(&rows), vec!["10/01/2024", "24/12/2023", "01/06/2023"]);

        let parsed: Vec<_> = dates(&rows)
            .iter()
            .map(|d| chrono::NaiveDate::parse_from_str(d, "%d/%m/%Y").unwrap())
            .collect();
        assert!(parsed.windows(2).all(|w| w[0] >= w[1]));

        // Input order untouched
        assert_eq!(records[0].product, "Corn");
    }

    #[test]
    fn test_equal_dates_keep_input_order() {
        let records = vec![
            sample_record("2024-01-10", "Ananas", 2.0, "gros", 2024),
            sample_record("2023-01-10", "Vieux", 1.0, "gros", 2023),
            sample_record("2024-01-10", "Banane", 1.2, "gros", 2024),
            sample_record("2024-01-10", "Carotte", 0.9, "gros", 2024),
        ];

        let products: Vec<String> = render_rows(&records)
            .into_iter()
            .filter_map(|row| match row {
                TableRow::Entry { product, .. } => Some(product),
                _ => None,
            })
            .collect();
        assert_eq!(products, vec!["Ananas", "Banane", "Carotte", "Vieux"]);
    }

    #[test]
    fn test_unparseable_dates_sort_last() {
        let records = vec![
            sample_record("inconnue", "A", 1.0, "gros", 2024),
            sample_record("2022-01-01", "B", 1.0, "gros", 2022),
        ];
        let rows = render_rows(&records);
        assert_eq!(dates(&rows), vec!["01/01/2022", "inconnue"]);
        assert!(parse_date("inconnue").is_none());
    }

    #[test]
    fn test_entry_formatting() {
        let mut record = sample_record("2024-01-10", "Wheat", 1.5, "A", 2024);
        record.unit = "pièce".to_string();

        let rows = render_rows(&[record]);
        assert_eq!(rows[0].cells(), vec!["10/01/2024", "Wheat", "1.50 €/pièce", "A"]);
    }

    #[test]
    fn test_price_rounds_to_two_decimals() {
        let record = sample_record("2024-01-10", "Wheat", 2.0 / 3.0, "A", 2024);
        assert_eq!(format_price(&record), "0.67 €/kg");
    }

    #[test]
    fn test_price_half_cent_rounds_up() {
        let record = sample_record("2024-01-10", "Wheat", 1.125, "A", 2024);
        assert_eq!(format_price(&record), "1.13 €/kg");

        let record = sample_record("2024-01-10", "Wheat", 1.005, "A", 2024);
        assert_eq!(format_price(&record), "1.00 €/kg");
    }
}
