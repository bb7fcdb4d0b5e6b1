// Export Encoder - spreadsheet-friendly CSV of the filtered selection

use crate::error::{DashboardError, Result};
use crate::record::{two_decimals, Record};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Name of the downloaded file
pub const EXPORT_FILENAME: &str = "mercuriales_daf_reelles.csv";

/// Notice shown when there is nothing to export
pub const NOTHING_TO_EXPORT: &str = "Aucune donnée à exporter.";

pub const HEADERS: [&str; 6] = ["Date", "Produit", "Prix (€/kg)", "Unité", "Marché", "Année"];

/// Lets spreadsheet tools pick UTF-8
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Encode `records` as `;`-separated rows behind a BOM and a header row.
///
/// Returns `NothingToExport` for an empty selection; no bytes are produced.
pub fn encode(records: &[Record]) -> Result<Vec<u8>> {
    if records.is_empty() {
        return Err(DashboardError::NothingToExport);
    }

    let mut wtr = csv::WriterBuilder::new()
        .delimiter(b';')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(UTF8_BOM.to_vec());

    wtr.write_record(HEADERS)?;
    for record in records {
        wtr.write_record([
            record.localized_date(),
            record.product.clone(),
            decimal_comma(record.price),
            record.unit.clone(),
            record.market.clone(),
            record.year.to_string(),
        ])?;
    }

    let mut bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    // Rows are joined, not terminated
    if bytes.last() == Some(&b'\n') {
        bytes.pop();
    }

    Ok(bytes)
}

/// `1.5` -> `1,50`
pub fn decimal_comma(price: f64) -> String {
    two_decimals(price).replace('.', ",")
}

/// Encode and write to `dir/mercuriales_daf_reelles.csv`, overwriting any previous export.
pub fn write_export(dir: &Path, records: &[Record]) -> Result<PathBuf> {
    let bytes = encode(records)?;

    fs::create_dir_all(dir)?;
    let path = dir.join(EXPORT_FILENAME);
    fs::write(&path, &bytes)?;

    info!(path = %path.display(), rows = records.len(), "export written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::sample_record;
    use tempfile::tempdir;

    fn body(bytes: &[u8]) -> &str {
        assert!(bytes.starts_with(UTF8_BOM));
        std::str::from_utf8(&bytes[UTF8_BOM.len()..]).unwrap()
    }

    #[test]
    fn test_empty_selection_is_nothing_to_export() {
        assert!(matches!(encode(&[]), Err(DashboardError::NothingToExport)));
    }

    #[test]
    fn test_layout() {
        let records = vec![
            sample_record("2024-01-10", "Wheat", 1.5, "A", 2024),
            sample_record("2023-06-01", "Corn", 2.0, "B", 2023),
        ];

        let bytes = encode(&records).unwrap();
        let text = body(&bytes);

        assert_eq!(
            text,
            "Date;Produit;Prix (€/kg);Unité;Marché;Année\n\
             10/01/2024;Wheat;1,50;kg;A;2024\n\
             01/06/2023;Corn;2,00;kg;B;2023"
        );
    }

    #[test]
    fn test_line_and_field_counts() {
        let records: Vec<Record> = (0..25)
            .map(|i| sample_record("2024-02-01", &format!("Produit {}", i), i as f64 * 0.37, "gros", 2024))
            .collect();

        let bytes = encode(&records).unwrap();
        let text = body(&bytes);
        let lines: Vec<&str> = text.split('\n').collect();

        assert_eq!(lines.len(), records.len() + 1);
        for line in lines {
            assert_eq!(line.split(';').count(), 6);
        }
    }

    #[test]
    fn test_delimiter_inside_field_is_quoted() {
        let records = vec![sample_record("2024-01-10", "Ail; local", 9.0, "gros", 2024)];
        let bytes = encode(&records).unwrap();

        let mut rdr = csv::ReaderBuilder::new()
            .delimiter(b';')
            .from_reader(body(&bytes).as_bytes());
        let rows: Vec<csv::StringRecord> = rdr.records().map(|r| r.unwrap()).collect();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].len(), 6);
        assert_eq!(&rows[0][1], "Ail; local");
    }

    #[test]
    fn test_decimal_comma() {
        assert_eq!(decimal_comma(1.5), "1,50");
        assert_eq!(decimal_comma(12.0), "12,00");
        assert_eq!(decimal_comma(2.0 / 3.0), "0,67");
        assert_eq!(decimal_comma(1.125), "1,13");
        assert_eq!(decimal_comma(0.625), "0,63");
        assert_eq!(decimal_comma(1.005), "1,00");
    }

    #[test]
    fn test_write_export() {
        let dir = tempdir().unwrap();
        let records = vec![sample_record("2024-01-10", "Wheat", 1.5, "A", 2024)];

        let path = write_export(dir.path(), &records).unwrap();
        assert_eq!(path.file_name().unwrap(), EXPORT_FILENAME);

        let written = fs::read(&path).unwrap();
        assert_eq!(written, encode(&records).unwrap());
    }

    #[test]
    fn test_write_export_empty_creates_no_file() {
        let dir = tempdir().unwrap();
        let result = write_export(dir.path(), &[]);

        assert!(matches!(result, Err(DashboardError::NothingToExport)));
        assert!(!dir.path().join(EXPORT_FILENAME).exists());
    }
}
