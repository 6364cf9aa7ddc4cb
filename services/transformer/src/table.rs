//! Raw tabular snapshot: named columns of optional string cells.

use crate::error::TransformError;

// =============================================================================
// Known raw column names (explicit, not inferred)
// =============================================================================
// Candidates are listed in priority order: the first one present wins.

pub const NAME_COLUMNS: &[&str] = &["name"];
pub const NAME_ALIAS: &str = "names";
pub const DATE_COLUMNS: &[&str] = &["date_x", "release_date", "date"];
pub const ORIGINAL_TITLE_COLUMNS: &[&str] = &["orig_title", "original_title"];
pub const OVERVIEW_COLUMNS: &[&str] = &["overview"];
pub const STATUS_COLUMNS: &[&str] = &["status"];
pub const GENRE_COLUMNS: &[&str] = &["genre", "genres"];
pub const CREW_COLUMNS: &[&str] = &["crew"];
pub const COUNTRY_COLUMNS: &[&str] = &["country"];
pub const LANGUAGE_COLUMNS: &[&str] = &["orig_lang", "language"];
pub const BUDGET_COLUMNS: &[&str] = &["budget_x", "budget"];
pub const REVENUE_COLUMNS: &[&str] = &["revenue"];
pub const SCORE_COLUMNS: &[&str] = &["score"];

pub type Cell = Option<String>;

/// Column-named rows as read from a snapshot. Every row has exactly one cell
/// per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl RawTable {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(|c| c.into().trim().to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Short rows are padded with missing cells, long rows truncated.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn with_rows(mut self, rows: impl IntoIterator<Item = Vec<Cell>>) -> Self {
        for row in rows {
            self.push_row(row);
        }
        self
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        let wanted = name.trim().to_lowercase();
        self.columns
            .iter()
            .position(|c| c.trim().to_lowercase() == wanted)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// First candidate present in the table, with its index.
    pub fn find_column<'c>(&self, candidates: &[&'c str]) -> Option<(usize, &'c str)> {
        candidates
            .iter()
            .find_map(|candidate| self.column_index(candidate).map(|idx| (idx, *candidate)))
    }

    pub fn require_column(
        &self,
        column: &'static str,
        candidates: &'static [&'static str],
    ) -> Result<usize, TransformError> {
        self.find_column(candidates)
            .map(|(idx, _)| idx)
            .ok_or(TransformError::MissingColumn { column, candidates })
    }

    /// Cell value, with blank cells reported as missing.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)?
            .get(column)?
            .as_deref()
            .filter(|value| !value.trim().is_empty())
    }

    pub fn rename_column(mut self, from: &str, to: &str) -> Self {
        if let Some(idx) = self.column_index(from) {
            self.columns[idx] = to.to_string();
        }
        self
    }

    pub fn drop_column(mut self, name: &str) -> Self {
        if let Some(idx) = self.column_index(name) {
            self.columns.remove(idx);
            for row in &mut self.rows {
                row.remove(idx);
            }
        }
        self
    }
}

/// Test helper: build a table from string literals, empty strings as missing.
#[cfg(test)]
pub(crate) fn table_from(columns: &[&str], rows: &[&[&str]]) -> RawTable {
    RawTable::new(columns.iter().copied()).with_rows(rows.iter().map(|row| {
        row.iter()
            .map(|v| if v.is_empty() { None } else { Some(v.to_string()) })
            .collect()
    }))
}
