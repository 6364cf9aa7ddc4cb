//! Pipeline entry point: raw table in, silver + gold bundle out.
//!
//! raw → parse → split → dimensions → bridges → facts → gold
//!
//! Every step is a pure function of its inputs. Nothing is kept between runs;
//! the caller owns the returned [`Warehouse`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::info;

use crate::bridges::{build_bridges, Bridges, MOVIE_CREW_TABLE, MOVIE_GENRE_TABLE};
use crate::config::TransformConfig;
use crate::dimensions::{build_dimensions, Dimensions};
use crate::error::TransformError;
use crate::facts::{build_fact_table, MoviePerformanceRow};
use crate::gold::{aggregate_at, GoldTables};
use crate::parse::parse_rows;
use crate::split::split_genre_and_crew;
use crate::table::RawTable;

pub const SILVER_TABLES: &[&str] = &[
    "dim_date",
    "dim_genre",
    "dim_language",
    "dim_country",
    "dim_movie",
    "dim_crew",
    "dim_role",
    MOVIE_GENRE_TABLE,
    MOVIE_CREW_TABLE,
    "fact_movie_performance",
];

pub const GOLD_TABLES: &[&str] = &["revenue_by_genre", "avg_score_by_year"];

/// Dimension, bridge and fact tables of one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SilverTables {
    pub dimensions: Dimensions,
    pub bridges: Bridges,
    pub fact_movie_performance: Vec<MoviePerformanceRow>,
}

impl SilverTables {
    /// Row count per silver table, keyed by table name.
    pub fn row_counts(&self) -> BTreeMap<&'static str, usize> {
        let d = &self.dimensions;
        let counts = [
            d.date.len(),
            d.genre.len(),
            d.language.len(),
            d.country.len(),
            d.movie.len(),
            d.crew.len(),
            d.role.len(),
            self.bridges.movie_genre.len(),
            self.bridges.movie_crew.len(),
            self.fact_movie_performance.len(),
        ];
        SILVER_TABLES.iter().copied().zip(counts).collect()
    }
}

impl GoldTables {
    /// Row count per gold table, keyed by table name.
    pub fn row_counts(&self) -> BTreeMap<&'static str, usize> {
        let counts = [self.revenue_by_genre.len(), self.avg_score_by_year.len()];
        GOLD_TABLES.iter().copied().zip(counts).collect()
    }
}

/// Bookkeeping of a run, reported alongside the tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub input_rows: usize,
    pub movies: usize,
    pub dropped_references: usize,
}

/// Result bundle of one transformation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Warehouse {
    pub silver: SilverTables,
    pub gold: GoldTables,
    pub stats: RunStats,
}

/// Run the whole pipeline, stamping gold rows with the current time.
pub fn transform(raw: RawTable, config: &TransformConfig) -> Result<Warehouse, TransformError> {
    transform_at(raw, config, Utc::now())
}

/// Run the whole pipeline with an explicit gold `updated_at`.
pub fn transform_at(
    raw: RawTable,
    config: &TransformConfig,
    updated_at: DateTime<Utc>,
) -> Result<Warehouse, TransformError> {
    let input_rows = raw.len();
    info!(input_rows, columns = raw.columns().len(), "transform started");

    let parsed = parse_rows(raw, config)?;
    let staged = split_genre_and_crew(parsed);
    let dimensions = build_dimensions(&staged)?;
    let bridges = build_bridges(&dimensions, config.references)?;
    let fact_movie_performance = build_fact_table(&staged, &dimensions.movie, config.values)?;

    let gold = aggregate_at(
        &fact_movie_performance,
        &bridges.movie_genre,
        &dimensions.genre,
        &dimensions.date,
        updated_at,
    );

    let stats = RunStats {
        input_rows,
        movies: dimensions.movie.len(),
        dropped_references: bridges.dropped,
    };
    info!(
        movies = stats.movies,
        dropped_references = stats.dropped_references,
        "transform completed"
    );

    Ok(Warehouse {
        silver: SilverTables {
            dimensions,
            bridges,
            fact_movie_performance,
        },
        gold,
        stats,
    })
}
