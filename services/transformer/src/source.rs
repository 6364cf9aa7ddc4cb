//! Snapshot Reader: raw movie snapshot files into a [`RawTable`].
//!
//! Supported formats:
//! - CSV (comma delimiter, header row, optional UTF-8 BOM)
//! - JSON (array of flat objects)
//! - XLS / XLSX / XLSB / ODS (first worksheet, header row)
//!
//! The reader keeps cells as text; typing happens in the pipeline. Native
//! spreadsheet date cells are rendered with the run's date format so the Row
//! Parser reads them like any other date text.

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use chrono::NaiveDate;
use serde_json::Value;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::DEFAULT_DATE_FORMAT;
use crate::error::SourceError;
use crate::table::{Cell, RawTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotFormat {
    Csv,
    Json,
    Spreadsheet,
}

impl SnapshotFormat {
    /// Detect format from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, SourceError> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "csv" => Ok(SnapshotFormat::Csv),
            "json" => Ok(SnapshotFormat::Json),
            "xls" | "xlsx" | "xlsm" | "xlsb" | "ods" => Ok(SnapshotFormat::Spreadsheet),
            other => Err(SourceError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Raw table plus the provenance of the bytes it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub format: SnapshotFormat,
    pub content_hash: String,
    pub size_bytes: usize,
    pub table: RawTable,
}

/// `sha256:<hex>` of the snapshot bytes.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("sha256:{:x}", hasher.finalize())
}

fn text_cell(value: &str) -> Cell {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse CSV content. Rows may be ragged; short rows are padded.
pub fn parse_csv(bytes: &[u8]) -> Result<RawTable, SourceError> {
    // Remove UTF-8 BOM if present
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(bytes);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();
    let mut table = RawTable::new(headers);

    for record in reader.records() {
        let record = record?;
        table.push_row(record.iter().map(text_cell).collect());
    }

    Ok(table)
}

fn json_cell(value: &Value) -> Cell {
    match value {
        Value::Null => None,
        Value::String(s) => text_cell(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Parse a JSON array of objects. Columns are the union of all keys in
/// first-appearance order.
pub fn parse_json(bytes: &[u8]) -> Result<RawTable, SourceError> {
    let records: Vec<serde_json::Map<String, Value>> = serde_json::from_slice(bytes)?;

    let mut columns: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }

    let rows: Vec<Vec<Cell>> = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|column| record.get(column).and_then(json_cell))
                .collect()
        })
        .collect();

    Ok(RawTable::new(columns).with_rows(rows))
}

/// `YYYY-MM-DD` prefix of an ISO 8601 date or date-time.
fn iso_date(value: &str) -> Option<NaiveDate> {
    let date = value.trim().get(..10)?;
    NaiveDate::parse_from_str(date, "%Y-%m-%d").ok()
}

fn spreadsheet_cell(cell: &Data, date_format: &str) -> Cell {
    match cell {
        Data::Empty => None,
        Data::String(s) => text_cell(s),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(datetime) => Some(datetime.date().format(date_format).to_string()),
            None => Some(dt.as_f64().to_string()),
        },
        Data::DateTimeIso(s) => match iso_date(s) {
            Some(date) => Some(date.format(date_format).to_string()),
            None => text_cell(s),
        },
        Data::Float(f) => Some(f.to_string()),
        Data::Int(i) => Some(i.to_string()),
        Data::Bool(b) => Some(b.to_string()),
        other => text_cell(&other.to_string()),
    }
}

/// Read the first worksheet of a workbook (calamine auto-detects the format).
/// Date cells are written out with `date_format`.
pub fn read_spreadsheet(path: &Path, date_format: &str) -> Result<RawTable, SourceError> {
    let mut workbook = open_workbook_auto(path)?;

    let sheet_names = workbook.sheet_names().to_vec();
    let Some(sheet_name) = sheet_names.first() else {
        return Err(SourceError::EmptySnapshot);
    };
    debug!(sheet = %sheet_name, sheets = sheet_names.len(), "reading first worksheet");

    let range = workbook.worksheet_range(sheet_name)?;
    let mut rows = range.rows();

    let Some(header_row) = rows.next() else {
        return Err(SourceError::EmptySnapshot);
    };
    let headers: Vec<String> = header_row
        .iter()
        .map(|cell| spreadsheet_cell(cell, date_format).unwrap_or_default())
        .collect();

    let table = RawTable::new(headers)
        .with_rows(rows.map(|row| row.iter().map(|cell| spreadsheet_cell(cell, date_format)).collect()));
    Ok(table)
}

/// Build a snapshot from already-read bytes. Spreadsheets are re-opened from
/// `path` since the workbook reader needs a file. `date_format` only affects
/// native spreadsheet date cells.
pub fn load_snapshot(path: &Path, bytes: &[u8], date_format: &str) -> Result<Snapshot, SourceError> {
    let format = SnapshotFormat::from_path(path)?;
    let table = match format {
        SnapshotFormat::Csv => parse_csv(bytes)?,
        SnapshotFormat::Json => parse_json(bytes)?,
        SnapshotFormat::Spreadsheet => read_spreadsheet(path, date_format)?,
    };

    if table.is_empty() {
        return Err(SourceError::EmptySnapshot);
    }

    let snapshot = Snapshot {
        format,
        content_hash: content_hash(bytes),
        size_bytes: bytes.len(),
        table,
    };
    info!(
        path = %path.display(),
        format = ?snapshot.format,
        rows = snapshot.table.len(),
        columns = snapshot.table.columns().len(),
        hash = %snapshot.content_hash,
        "snapshot loaded"
    );
    Ok(snapshot)
}

/// Read `path` from disk and build a snapshot, rendering spreadsheet dates in
/// the default date format.
pub fn read_snapshot(path: &Path) -> Result<Snapshot, SourceError> {
    let bytes = std::fs::read(path)?;
    load_snapshot(path, &bytes, DEFAULT_DATE_FORMAT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    const CSV: &str = "names,date_x,score,genre,crew,country\n\
Heat,12/15/1995,76,\"Action, Crime\",\"Al Pacino, Vincent Hanna\",US\n\
Up,05/29/2009,,Animation,,US\n";

    // -------------------------------------------------------------------------
    // FORMAT DETECTION
    // -------------------------------------------------------------------------

    #[test]
    fn test_format_from_extension() {
        assert_eq!(SnapshotFormat::from_path(Path::new("a/movies.CSV")).unwrap(), SnapshotFormat::Csv);
        assert_eq!(SnapshotFormat::from_path(Path::new("movies.json")).unwrap(), SnapshotFormat::Json);
        assert_eq!(
            SnapshotFormat::from_path(Path::new("movies.xlsx")).unwrap(),
            SnapshotFormat::Spreadsheet
        );
    }

    #[test]
    fn test_unsupported_format() {
        let err = SnapshotFormat::from_path(Path::new("movies.pdf")).unwrap_err();
        assert_matches!(err, SourceError::UnsupportedFormat(ext) if ext == "pdf");
    }

    // -------------------------------------------------------------------------
    // CSV
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_csv_quoted_fields() {
        let table = parse_csv(CSV.as_bytes()).unwrap();
        assert_eq!(table.len(), 2);
        let genre = table.column_index("genre").unwrap();
        let crew = table.column_index("crew").unwrap();
        assert_eq!(table.cell(0, genre), Some("Action, Crime"));
        assert_eq!(table.cell(0, crew), Some("Al Pacino, Vincent Hanna"));
        assert_eq!(table.cell(1, crew), None);
    }

    #[test]
    fn test_parse_csv_strips_bom() {
        let mut bytes = b"\xEF\xBB\xBF".to_vec();
        bytes.extend_from_slice(CSV.as_bytes());
        let table = parse_csv(&bytes).unwrap();
        assert_eq!(table.columns()[0], "names");
    }

    #[test]
    fn test_parse_csv_ragged_rows() {
        let table = parse_csv(b"a,b,c\n1,2\n").unwrap();
        assert_eq!(table.cell(0, 1), Some("2"));
        assert_eq!(table.cell(0, 2), None);
    }

    // -------------------------------------------------------------------------
    // JSON
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_json_matches_csv() {
        let json = r#"[
            {"names": "Heat", "date_x": "12/15/1995", "score": 76, "genre": "Action, Crime", "crew": "Al Pacino, Vincent Hanna", "country": "US"},
            {"names": "Up", "date_x": "05/29/2009", "score": null, "genre": "Animation", "crew": "", "country": "US"}
        ]"#;
        let from_json = parse_json(json.as_bytes()).unwrap();
        let from_csv = parse_csv(CSV.as_bytes()).unwrap();

        for column in from_csv.columns() {
            let a = from_csv.column_index(column).unwrap();
            let b = from_json.column_index(column).unwrap();
            for row in 0..from_csv.len() {
                assert_eq!(from_csv.cell(row, a), from_json.cell(row, b), "column {}", column);
            }
        }
    }

    #[test]
    fn test_parse_json_union_of_keys() {
        let table = parse_json(br#"[{"a": 1}, {"b": true}]"#).unwrap();
        assert_eq!(table.columns().len(), 2);
        let b = table.column_index("b").unwrap();
        assert_eq!(table.cell(0, b), None);
        assert_eq!(table.cell(1, b), Some("true"));
    }

    #[test]
    fn test_parse_json_not_an_array() {
        let err = parse_json(br#"{"names": "Heat"}"#).unwrap_err();
        assert_matches!(err, SourceError::Json(_));
    }

    // -------------------------------------------------------------------------
    // SPREADSHEET
    // -------------------------------------------------------------------------

    const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";

    fn inline(cell: &str, text: &str) -> String {
        format!(r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#, cell, text)
    }

    /// Minimal workbook: a header row and one movie whose `date_x` cell is a
    /// native date (serial 35048 = 1995-12-15, built-in format 14).
    fn write_workbook(path: &Path) {
        use zip::write::SimpleFileOptions;

        let header = ["names", "date_x", "country", "orig_lang", "budget_x", "revenue", "score"];
        let columns = ["A", "B", "C", "D", "E", "F", "G"];
        let header_row: String = header
            .iter()
            .zip(columns)
            .map(|(name, col)| inline(&format!("{}1", col), name))
            .collect();
        let movie_row = format!(
            r#"{}<c r="B2" s="1"><v>35048</v></c>{}{}<c r="E2"><v>60</v></c><c r="F2"><v>180</v></c><c r="G2"><v>76</v></c>"#,
            inline("A2", "Heat"),
            inline("C2", "US"),
            inline("D2", "English"),
        );
        let sheet = format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{}"><sheetData><row r="1">{}</row><row r="2">{}</row></sheetData></worksheet>"#,
            MAIN_NS, header_row, movie_row
        );

        let parts: Vec<(&str, String)> = vec![
            (
                "[Content_Types].xml",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/></Types>"#.to_string(),
            ),
            (
                "_rels/.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
            ),
            (
                "xl/workbook.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{}" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="movies" sheetId="1" r:id="rId1"/></sheets></workbook>"#,
                    MAIN_NS
                ),
            ),
            (
                "xl/_rels/workbook.xml.rels",
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#.to_string(),
            ),
            (
                "xl/styles.xml",
                format!(
                    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><styleSheet xmlns="{}"><cellXfs count="2"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/></cellXfs></styleSheet>"#,
                    MAIN_NS
                ),
            ),
            ("xl/worksheets/sheet1.xml", sheet),
        ];

        let file = std::fs::File::create(path).unwrap();
        let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
        let mut archive = zip::ZipWriter::new(file);
        for (name, content) in parts {
            archive.start_file(name, options).unwrap();
            archive.write_all(content.as_bytes()).unwrap();
        }
        archive.finish().unwrap();
    }

    #[test]
    fn test_spreadsheet_date_cell_uses_date_format() {
        assert_eq!(
            spreadsheet_cell(&Data::DateTimeIso("1995-12-15T00:00:00".into()), DEFAULT_DATE_FORMAT),
            Some("12/15/1995".to_string())
        );
        assert_eq!(
            spreadsheet_cell(&Data::DateTimeIso("1995-12-15".into()), "%Y-%m-%d"),
            Some("1995-12-15".to_string())
        );
        assert_eq!(spreadsheet_cell(&Data::Float(60.0), DEFAULT_DATE_FORMAT), Some("60".to_string()));
        assert_eq!(spreadsheet_cell(&Data::Int(7), DEFAULT_DATE_FORMAT), Some("7".to_string()));
        assert_eq!(spreadsheet_cell(&Data::Empty, DEFAULT_DATE_FORMAT), None);
    }

    #[test]
    fn test_read_spreadsheet_native_date_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.xlsx");
        write_workbook(&path);

        let snapshot = read_snapshot(&path).unwrap();
        assert_eq!(snapshot.format, SnapshotFormat::Spreadsheet);
        let table = &snapshot.table;
        assert_eq!(table.len(), 1);
        let name = table.column_index("names").unwrap();
        let date = table.column_index("date_x").unwrap();
        let budget = table.column_index("budget_x").unwrap();
        assert_eq!(table.cell(0, name), Some("Heat"));
        assert_eq!(table.cell(0, date), Some("12/15/1995"));
        assert_eq!(table.cell(0, budget), Some("60"));

        let custom = read_spreadsheet(&path, "%Y-%m-%d").unwrap();
        assert_eq!(custom.cell(0, date), Some("1995-12-15"));
    }

    #[test]
    fn test_spreadsheet_dates_reach_date_dimension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("movies.xlsx");
        write_workbook(&path);

        let snapshot = read_snapshot(&path).unwrap();
        let warehouse = crate::pipeline::transform(snapshot.table, &crate::config::TransformConfig::strict()).unwrap();
        let dims = &warehouse.silver.dimensions;
        assert_eq!(dims.date.len(), 1);
        assert_eq!(dims.date[0].release_date, NaiveDate::from_ymd_opt(1995, 12, 15).unwrap());
        assert_eq!(dims.movie[0].date_id, Some(1));
        assert_eq!(warehouse.gold.avg_score_by_year[0].year, 1995);
    }

    // -------------------------------------------------------------------------
    // SNAPSHOT
    // -------------------------------------------------------------------------

    #[test]
    fn test_content_hash_format() {
        let hash = content_hash(b"abc");
        assert_eq!(
            hash,
            "sha256:ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_read_snapshot_from_file() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(CSV.as_bytes()).unwrap();

        let snapshot = read_snapshot(file.path()).unwrap();
        assert_eq!(snapshot.format, SnapshotFormat::Csv);
        assert_eq!(snapshot.table.len(), 2);
        assert_eq!(snapshot.size_bytes, CSV.len());
        assert_eq!(snapshot.content_hash, content_hash(CSV.as_bytes()));
    }

    #[test]
    fn test_header_only_snapshot_is_empty() {
        let err = load_snapshot(Path::new("movies.csv"), b"names,date_x\n", DEFAULT_DATE_FORMAT).unwrap_err();
        assert_matches!(err, SourceError::EmptySnapshot);
    }
}
