//! Row Parser: canonical `name` column and typed release dates.
//!
//! This step is DETERMINISTIC: same raw table + same config = same output.

use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::config::{TransformConfig, ValuePolicy};
use crate::error::TransformError;
use crate::table::{RawTable, DATE_COLUMNS, NAME_ALIAS, NAME_COLUMNS};

/// Raw table with a canonical `name` column and a parsed release date per row.
///
/// The source date column is consumed: its typed values live in
/// `release_dates`, aligned with the table rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTable {
    table: RawTable,
    name_column: usize,
    release_dates: Vec<Option<NaiveDate>>,
}

impl ParsedTable {
    pub fn table(&self) -> &RawTable {
        &self.table
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn name(&self, row: usize) -> Option<&str> {
        self.table.cell(row, self.name_column).map(str::trim)
    }

    pub fn release_date(&self, row: usize) -> Option<NaiveDate> {
        self.release_dates.get(row).copied().flatten()
    }

    pub fn release_dates(&self) -> &[Option<NaiveDate>] {
        &self.release_dates
    }
}

/// Rename `names` to `name` when needed. If both exist, `names` is dropped.
pub fn standardize_columns(table: RawTable) -> Result<RawTable, TransformError> {
    let has_name = table.has_column("name");
    let table = match (has_name, table.has_column(NAME_ALIAS)) {
        (false, true) => table.rename_column(NAME_ALIAS, "name"),
        (true, true) => table.drop_column(NAME_ALIAS),
        _ => table,
    };

    table.require_column("name", NAME_COLUMNS)?;
    Ok(table)
}

/// Parse one date value. Surrounding whitespace is ignored.
pub fn parse_date(value: &str, format: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), format).ok()
}

/// Replace the first present date-like column with typed release dates.
pub fn parse_release_dates(
    table: RawTable,
    config: &TransformConfig,
) -> Result<ParsedTable, TransformError> {
    let (date_column, date_name) =
        table
            .find_column(DATE_COLUMNS)
            .ok_or(TransformError::MissingColumn {
                column: "release_date",
                candidates: DATE_COLUMNS,
            })?;
    debug!(column = date_name, format = %config.date_format, "parsing release dates");

    let mut release_dates = Vec::with_capacity(table.len());
    let mut unparsed = 0usize;

    for row in 0..table.len() {
        let date = match table.cell(row, date_column) {
            None => None,
            Some(value) => match parse_date(value, &config.date_format) {
                Some(date) => Some(date),
                None if config.values == ValuePolicy::Strict => {
                    return Err(TransformError::InvalidDate {
                        record: row + 1,
                        value: value.to_string(),
                        format: config.date_format.clone(),
                    });
                }
                None => {
                    unparsed += 1;
                    None
                }
            },
        };
        release_dates.push(date);
    }

    if unparsed > 0 {
        warn!(unparsed, column = date_name, "unparseable release dates set to null");
    }

    let source_name = table.columns()[date_column].clone();
    let table = table.drop_column(&source_name);
    let name_column = table.require_column("name", NAME_COLUMNS)?;

    Ok(ParsedTable {
        table,
        name_column,
        release_dates,
    })
}

/// Full Row Parser step.
pub fn parse_rows(table: RawTable, config: &TransformConfig) -> Result<ParsedTable, TransformError> {
    let table = standardize_columns(table)?;
    parse_release_dates(table, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::table_from;
    use assert_matches::assert_matches;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // -------------------------------------------------------------------------
    // COLUMN STANDARDIZATION
    // -------------------------------------------------------------------------

    #[test]
    fn test_names_renamed_to_name() {
        let table = table_from(&["names", "date_x"], &[&["Heat", "12/15/1995"]]);
        let parsed = parse_rows(table, &TransformConfig::default()).unwrap();
        assert_eq!(parsed.name(0), Some("Heat"));
    }

    #[test]
    fn test_names_dropped_when_name_present() {
        let table = table_from(&["name", "names", "date_x"], &[&["Heat", "Other", "12/15/1995"]]);
        let parsed = parse_rows(table, &TransformConfig::default()).unwrap();
        assert_eq!(parsed.name(0), Some("Heat"));
        assert!(!parsed.table().has_column("names"));
    }

    #[test]
    fn test_missing_name_column() {
        let table = table_from(&["title", "date_x"], &[&["Heat", "12/15/1995"]]);
        let err = parse_rows(table, &TransformConfig::default()).unwrap_err();
        assert_matches!(err, TransformError::MissingColumn { column: "name", .. });
    }

    // -------------------------------------------------------------------------
    // DATE PARSING
    // -------------------------------------------------------------------------

    #[test]
    fn test_date_parsed_month_day_year() {
        let table = table_from(&["name", "date_x"], &[&["Heat", " 12/15/1995 "]]);
        let parsed = parse_rows(table, &TransformConfig::default()).unwrap();
        assert_eq!(parsed.release_date(0), Some(ymd(1995, 12, 15)));
        assert!(!parsed.table().has_column("date_x"));
    }

    #[test]
    fn test_date_column_priority() {
        let table = table_from(
            &["name", "date", "release_date"],
            &[&["Heat", "01/01/2000", "12/15/1995"]],
        );
        let parsed = parse_rows(table, &TransformConfig::default()).unwrap();
        assert_eq!(parsed.release_date(0), Some(ymd(1995, 12, 15)));
        // the lower-priority column is left alone
        assert!(parsed.table().has_column("date"));
    }

    #[test]
    fn test_unparseable_date_becomes_null() {
        let table = table_from(
            &["name", "date"],
            &[&["A", "1995-12-15"], &["B", ""], &["C", "02/29/2024"]],
        );
        let parsed = parse_rows(table, &TransformConfig::default()).unwrap();
        assert_eq!(parsed.release_dates(), &[None, None, Some(ymd(2024, 2, 29))]);
    }

    #[test]
    fn test_unparseable_date_strict_fails() {
        let table = table_from(&["name", "date"], &[&["A", "03/04/2001"], &["B", "not a date"]]);
        let err = parse_rows(table, &TransformConfig::strict()).unwrap_err();
        assert_matches!(err, TransformError::InvalidDate { record: 2, .. });
    }

    #[test]
    fn test_missing_date_column() {
        let table = table_from(&["name", "genre"], &[&["Heat", "Crime"]]);
        let err = parse_rows(table, &TransformConfig::default()).unwrap_err();
        assert_matches!(err, TransformError::MissingColumn { column: "release_date", .. });
    }

    #[test]
    fn test_custom_date_format() {
        let table = table_from(&["name", "date"], &[&["Heat", "1995-12-15"]]);
        let config = TransformConfig::default().with_date_format("%Y-%m-%d");
        let parsed = parse_rows(table, &config).unwrap();
        assert_eq!(parsed.release_date(0), Some(ymd(1995, 12, 15)));
    }
}
