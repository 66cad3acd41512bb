//! CSV source reading for the batch importer.
//!
//! Exports arrive either semicolon- or comma-delimited depending on the
//! logger firmware's locale, so the delimiter is sniffed from the head of
//! the file. Column order is irrelevant; cells are kept as raw strings and
//! typed later by the normalizer.

use std::fs;
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::ImportError;
use crate::models::RawCsvRow;

// ---

const SNIFF_LEN: usize = 1024;

/// Detect the field delimiter from a sample of the file's first bytes:
/// `;` if present, `,` otherwise.
pub fn detect_delimiter(text: &str) -> u8 {
    // ---
    let sample = &text.as_bytes()[..text.len().min(SNIFF_LEN)];
    if sample.contains(&b';') {
        b';'
    } else {
        b','
    }
}

/// Read a CSV export into raw rows.
///
/// Fails with [`ImportError::SourceNotFound`] if the path does not exist.
/// A header row is required; data rows may be ragged (missing cells come
/// back as empty strings and fail typed parsing in the normalizer).
pub fn read_rows(path: &Path) -> Result<Vec<RawCsvRow>, ImportError> {
    // ---
    if !path.exists() {
        return Err(ImportError::SourceNotFound(path.to_path_buf()));
    }

    let text = fs::read_to_string(path)?;
    let delimiter = detect_delimiter(&text);

    parse_rows(&text, delimiter)
}

fn parse_rows(text: &str, delimiter: u8) -> Result<Vec<RawCsvRow>, ImportError> {
    // ---
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);

    let time_s = column("Time(s)");
    let water_level = column("WaterLevel");
    let light_status = column("LightStatus");
    let status = column("Status");
    let led = column("LED");
    let buzzer = column("Buzzer");

    let cell = |record: &csv::StringRecord, idx: Option<usize>| -> String {
        idx.and_then(|i| record.get(i)).unwrap_or("").to_string()
    };

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(RawCsvRow {
            time_s: cell(&record, time_s),
            water_level: cell(&record, water_level),
            light_status: cell(&record, light_status),
            status: cell(&record, status),
            led: cell(&record, led),
            buzzer: cell(&record, buzzer),
        });
    }

    Ok(rows)
}

// ---

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn detects_semicolon_delimiter() {
        // ---
        assert_eq!(detect_delimiter("Time(s);WaterLevel\n0;1\n"), b';');
    }

    #[test]
    fn defaults_to_comma_delimiter() {
        // ---
        assert_eq!(detect_delimiter("Time(s),WaterLevel\n0,1\n"), b',');
    }

    #[test]
    fn sniffs_only_the_file_head() {
        // ---
        // A semicolon past the first 1024 bytes must not flip the delimiter.
        let mut text = "Time(s),WaterLevel\n".to_string();
        while text.len() <= SNIFF_LEN {
            text.push_str("0,1\n");
        }
        text.push_str("2;3\n");
        assert_eq!(detect_delimiter(&text), b',');
    }

    #[test]
    fn parses_rows_regardless_of_column_order() {
        // ---
        let text = "Buzzer;Time(s);LightStatus;WaterLevel;LED;Status\n1;30;DAY;5;0;ALERT\n";
        let rows = parse_rows(text, b';').unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].time_s, "30");
        assert_eq!(rows[0].water_level, "5");
        assert_eq!(rows[0].light_status, "DAY");
        assert_eq!(rows[0].status, "ALERT");
        assert_eq!(rows[0].buzzer, "1");
    }

    #[test]
    fn ragged_row_yields_empty_cells() {
        // ---
        let text = "Time(s);WaterLevel;LightStatus;Status;LED;Buzzer\n10;5\n";
        let rows = parse_rows(text, b';').unwrap();
        assert_eq!(rows[0].time_s, "10");
        assert_eq!(rows[0].buzzer, "");
    }

    #[test]
    fn header_only_file_yields_no_rows() {
        // ---
        let text = "Time(s);WaterLevel;LightStatus;Status;LED;Buzzer\n";
        assert!(parse_rows(text, b';').unwrap().is_empty());
    }
}
