//! Fact Builder: one movie-performance row per movie.

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ValuePolicy;
use crate::dimensions::MovieRow;
use crate::error::TransformError;
use crate::keys::surrogate_id;
use crate::split::StagedTable;
use crate::table::{RawTable, BUDGET_COLUMNS, REVENUE_COLUMNS, SCORE_COLUMNS};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoviePerformanceRow {
    pub financial_id: u32,
    pub movie_id: u32,
    pub date_id: Option<u32>,
    pub language_id: Option<u32>,
    pub country_id: Option<u32>,
    pub score: Option<f64>,
    pub budget: Option<f64>,
    pub revenue: Option<f64>,
    pub profit: Option<f64>,
}

/// `revenue - budget`, missing if either side is missing.
pub fn profit(revenue: Option<f64>, budget: Option<f64>) -> Option<f64> {
    Some(revenue? - budget?)
}

/// Measure columns resolved against the raw input.
struct MeasureColumns {
    budget: usize,
    revenue: usize,
    score: usize,
}

impl MeasureColumns {
    fn resolve(table: &RawTable) -> Result<Self, TransformError> {
        Ok(Self {
            budget: table.require_column("budget", BUDGET_COLUMNS)?,
            revenue: table.require_column("revenue", REVENUE_COLUMNS)?,
            score: table.require_column("score", SCORE_COLUMNS)?,
        })
    }
}

/// Parse a measure cell. Missing cells are missing measures.
fn parse_measure(
    table: &RawTable,
    row: usize,
    column: usize,
    name: &'static str,
    policy: ValuePolicy,
    invalid: &mut usize,
) -> Result<Option<f64>, TransformError> {
    let Some(value) = table.cell(row, column) else {
        return Ok(None);
    };
    match value.trim().parse::<f64>() {
        Ok(number) if number.is_finite() => Ok(Some(number)),
        _ if policy == ValuePolicy::Strict => Err(TransformError::InvalidNumber {
            column: name,
            record: row + 1,
            value: value.to_string(),
        }),
        _ => {
            *invalid += 1;
            Ok(None)
        }
    }
}

/// Fact Builder step. Each movie is joined back to the raw row it was first
/// seen at; profit is computed here and stored.
pub fn build_fact_table(
    staged: &StagedTable,
    movies: &[MovieRow],
    policy: ValuePolicy,
) -> Result<Vec<MoviePerformanceRow>, TransformError> {
    let table = staged.table();
    let columns = MeasureColumns::resolve(table)?;
    let mut invalid = 0usize;
    let mut facts = Vec::with_capacity(movies.len());

    for movie in movies {
        let row = movie.source_row;
        let budget = parse_measure(table, row, columns.budget, "budget", policy, &mut invalid)?;
        let revenue = parse_measure(table, row, columns.revenue, "revenue", policy, &mut invalid)?;
        let score = parse_measure(table, row, columns.score, "score", policy, &mut invalid)?;

        facts.push(MoviePerformanceRow {
            financial_id: surrogate_id(facts.len()),
            movie_id: movie.movie_id,
            date_id: movie.date_id,
            language_id: movie.language_id,
            country_id: movie.country_id,
            score,
            budget,
            revenue,
            profit: profit(revenue, budget),
        });
    }

    if invalid > 0 {
        warn!(invalid, "unparseable measures set to null");
    }
    info!(facts = facts.len(), "built fact table");
    Ok(facts)
}
