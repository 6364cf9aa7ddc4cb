use thiserror::Error;

/// Failures raised by the transformation core.
///
/// Under the lenient policies only `MissingColumn` can abort a run; the other
/// variants surface when the matching policy is strict.
#[derive(Debug, Error)]
pub enum TransformError {
    #[error("Missing column '{column}' (looked for {candidates:?})")]
    MissingColumn {
        column: &'static str,
        candidates: &'static [&'static str],
    },

    #[error("Invalid date at record {record}: '{value}' does not match '{format}'")]
    InvalidDate {
        record: usize,
        value: String,
        format: String,
    },

    #[error("Invalid number in '{column}' at record {record}: '{value}'")]
    InvalidNumber {
        column: &'static str,
        record: usize,
        value: String,
    },

    #[error("Unresolved reference in {table}: movie {movie_id} -> '{key}'")]
    UnresolvedReference {
        table: &'static str,
        movie_id: u32,
        key: String,
    },
}

/// Failures while turning a snapshot file into a raw table.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Unsupported snapshot format: '{0}'")]
    UnsupportedFormat(String),

    #[error("Snapshot has no data rows")]
    EmptySnapshot,
}

/// Failures while rendering tables for hand-off.
#[derive(Debug, Error)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
