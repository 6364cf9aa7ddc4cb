//! Table Writer: renders a [`Warehouse`] into CSV files plus a run manifest.
//!
//! Rendering is pure (bytes in memory); the binary decides where they go.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::bridges::{MovieCrewRow, MovieGenreRow};
use crate::dimensions::{CountryRow, CrewRow, DateRow, GenreRow, LanguageRow, MovieRow, RoleRow};
use crate::error::WriteError;
use crate::facts::MoviePerformanceRow;
use crate::gold::{AvgScoreByYearRow, RevenueByGenreRow};
use crate::pipeline::Warehouse;

pub const MANIFEST_FILE: &str = "manifest.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layer {
    Silver,
    Gold,
}

impl Layer {
    pub fn as_str(&self) -> &'static str {
        match self {
            Layer::Silver => "silver",
            Layer::Gold => "gold",
        }
    }
}

/// One table rendered as CSV.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedTable {
    pub layer: Layer,
    pub name: &'static str,
    pub rows: usize,
    pub bytes: Vec<u8>,
}

impl RenderedTable {
    /// `<layer>/<name>.csv`, relative to the output directory.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.layer.as_str()).join(format!("{}.csv", self.name))
    }
}

/// A row type with a fixed CSV header, in serialized field order.
pub trait TableRow: Serialize {
    const COLUMNS: &'static [&'static str];
}

macro_rules! table_row {
    ($row:ty, [$($column:literal),+ $(,)?]) => {
        impl TableRow for $row {
            const COLUMNS: &'static [&'static str] = &[$($column),+];
        }
    };
}

table_row!(DateRow, ["date_id", "release_date", "year", "month", "day", "quarter"]);
table_row!(GenreRow, ["genre_id", "genre_name"]);
table_row!(LanguageRow, ["language_id", "language_name"]);
table_row!(CountryRow, ["country_id", "country_name"]);
table_row!(
    MovieRow,
    ["movie_id", "name", "orig_title", "overview", "status", "release_date", "date_id", "language_id", "country_id"]
);
table_row!(CrewRow, ["crew_id", "crew_name"]);
table_row!(RoleRow, ["role_id", "role"]);
table_row!(MovieGenreRow, ["movie_genre_id", "movie_id", "genre_id"]);
table_row!(MovieCrewRow, ["movie_crew_id", "movie_id", "crew_id", "role_id", "character_name"]);
table_row!(
    MoviePerformanceRow,
    ["financial_id", "movie_id", "date_id", "language_id", "country_id", "score", "budget", "revenue", "profit"]
);
table_row!(RevenueByGenreRow, ["genre_name", "total_revenue", "updated_at"]);
table_row!(AvgScoreByYearRow, ["year", "avg_score", "updated_at"]);

/// Serialize rows under the row type's header. An empty table still gets
/// its header line.
pub fn rows_to_csv<R: TableRow>(rows: &[R]) -> Result<Vec<u8>, WriteError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(R::COLUMNS)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| WriteError::Io(e.into_error()))
}

fn render<R: TableRow>(layer: Layer, name: &'static str, rows: &[R]) -> Result<RenderedTable, WriteError> {
    Ok(RenderedTable {
        layer,
        name,
        rows: rows.len(),
        bytes: rows_to_csv(rows)?,
    })
}

/// Every silver and gold table, in bundle order.
pub fn render_warehouse(warehouse: &Warehouse) -> Result<Vec<RenderedTable>, WriteError> {
    let d = &warehouse.silver.dimensions;
    let b = &warehouse.silver.bridges;
    let g = &warehouse.gold;

    Ok(vec![
        render(Layer::Silver, "dim_date", &d.date)?,
        render(Layer::Silver, "dim_genre", &d.genre)?,
        render(Layer::Silver, "dim_language", &d.language)?,
        render(Layer::Silver, "dim_country", &d.country)?,
        render(Layer::Silver, "dim_movie", &d.movie)?,
        render(Layer::Silver, "dim_crew", &d.crew)?,
        render(Layer::Silver, "dim_role", &d.role)?,
        render(Layer::Silver, "bridge_movie_genre", &b.movie_genre)?,
        render(Layer::Silver, "bridge_movie_crew", &b.movie_crew)?,
        render(Layer::Silver, "fact_movie_performance", &warehouse.silver.fact_movie_performance)?,
        render(Layer::Gold, "revenue_by_genre", &g.revenue_by_genre)?,
        render(Layer::Gold, "avg_score_by_year", &g.avg_score_by_year)?,
    ])
}

/// Record of one run, written next to the tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub input: String,
    pub content_hash: String,
    pub strict: bool,
    pub date_format: String,
    pub input_rows: usize,
    pub dropped_references: usize,
    pub tables: BTreeMap<String, usize>,
}

impl RunManifest {
    pub fn new(
        started_at: DateTime<Utc>,
        input: impl Into<String>,
        content_hash: impl Into<String>,
        strict: bool,
        date_format: impl Into<String>,
        warehouse: &Warehouse,
    ) -> Self {
        let tables = warehouse
            .silver
            .row_counts()
            .into_iter()
            .chain(warehouse.gold.row_counts())
            .map(|(name, count)| (name.to_string(), count))
            .collect();

        Self {
            run_id: Uuid::new_v4(),
            started_at,
            finished_at: Utc::now(),
            input: input.into(),
            content_hash: content_hash.into(),
            strict,
            date_format: date_format.into(),
            input_rows: warehouse.stats.input_rows,
            dropped_references: warehouse.stats.dropped_references,
            tables,
        }
    }

    pub fn to_json(&self) -> Result<Vec<u8>, WriteError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }
}

/// Write every table to `<dir>/<layer>/<name>.csv` and the manifest to
/// `<dir>/manifest.json`. Existing files are overwritten. Returns the paths
/// written, manifest last.
pub fn write_warehouse(
    dir: &Path,
    warehouse: &Warehouse,
    manifest: &RunManifest,
) -> Result<Vec<PathBuf>, WriteError> {
    let mut written = Vec::new();

    for table in render_warehouse(warehouse)? {
        let path = dir.join(table.relative_path());
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &table.bytes)?;
        debug!(path = %path.display(), rows = table.rows, "table written");
        written.push(path);
    }

    let manifest_path = dir.join(MANIFEST_FILE);
    fs::create_dir_all(dir)?;
    fs::write(&manifest_path, manifest.to_json()?)?;
    written.push(manifest_path);

    info!(dir = %dir.display(), files = written.len(), run_id = %manifest.run_id, "warehouse written");
    Ok(written)
}
