//! Gold Aggregator: revenue by genre and average score by year.
//!
//! Uses BTreeMap grouping so output rows come out ordered by their key.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::bridges::MovieGenreRow;
use crate::dimensions::{DateRow, GenreRow};
use crate::facts::MoviePerformanceRow;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueByGenreRow {
    pub genre_name: String,
    pub total_revenue: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvgScoreByYearRow {
    pub year: i32,
    pub avg_score: f64,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoldTables {
    pub revenue_by_genre: Vec<RevenueByGenreRow>,
    pub avg_score_by_year: Vec<AvgScoreByYearRow>,
}

/// fact ⋈ bridge_movie_genre ⋈ dim_genre, summed per genre name.
pub fn revenue_by_genre(
    facts: &[MoviePerformanceRow],
    movie_genre: &[MovieGenreRow],
    genres: &[GenreRow],
    updated_at: DateTime<Utc>,
) -> Vec<RevenueByGenreRow> {
    let genre_names: HashMap<u32, &str> = genres
        .iter()
        .map(|g| (g.genre_id, g.genre_name.as_str()))
        .collect();

    let mut bridge_by_movie: HashMap<u32, Vec<u32>> = HashMap::new();
    for link in movie_genre {
        bridge_by_movie
            .entry(link.movie_id)
            .or_default()
            .push(link.genre_id);
    }

    let mut totals: BTreeMap<&str, f64> = BTreeMap::new();
    for fact in facts {
        let Some(genre_ids) = bridge_by_movie.get(&fact.movie_id) else {
            continue;
        };
        for genre_id in genre_ids {
            if let Some(&name) = genre_names.get(genre_id) {
                *totals.entry(name).or_insert(0.0) += fact.revenue.unwrap_or(0.0);
            }
        }
    }

    totals
        .into_iter()
        .map(|(genre_name, total_revenue)| RevenueByGenreRow {
            genre_name: genre_name.to_string(),
            total_revenue,
            updated_at,
        })
        .collect()
}

/// fact ⋈ dim_date on the fact's date id, mean score per year.
///
/// Facts with no date or no score do not contribute.
pub fn avg_score_by_year(
    facts: &[MoviePerformanceRow],
    dates: &[DateRow],
    updated_at: DateTime<Utc>,
) -> Vec<AvgScoreByYearRow> {
    let years: HashMap<u32, i32> = dates.iter().map(|d| (d.date_id, d.year)).collect();

    let mut sums: BTreeMap<i32, (f64, usize)> = BTreeMap::new();
    for fact in facts {
        let (Some(date_id), Some(score)) = (fact.date_id, fact.score) else {
            continue;
        };
        if let Some(&year) = years.get(&date_id) {
            let entry = sums.entry(year).or_insert((0.0, 0));
            entry.0 += score;
            entry.1 += 1;
        }
    }

    sums.into_iter()
        .map(|(year, (sum, count))| AvgScoreByYearRow {
            year,
            avg_score: sum / count as f64,
            updated_at,
        })
        .collect()
}

/// Both gold tables stamped with one shared `updated_at`.
pub fn aggregate_at(
    facts: &[MoviePerformanceRow],
    movie_genre: &[MovieGenreRow],
    genres: &[GenreRow],
    dates: &[DateRow],
    updated_at: DateTime<Utc>,
) -> GoldTables {
    let gold = GoldTables {
        revenue_by_genre: revenue_by_genre(facts, movie_genre, genres, updated_at),
        avg_score_by_year: avg_score_by_year(facts, dates, updated_at),
    };
    info!(
        revenue_by_genre = gold.revenue_by_genre.len(),
        avg_score_by_year = gold.avg_score_by_year.len(),
        %updated_at,
        "built gold tables"
    );
    gold
}

/// [`aggregate_at`] with the current time.
pub fn aggregate(
    facts: &[MoviePerformanceRow],
    movie_genre: &[MovieGenreRow],
    genres: &[GenreRow],
    dates: &[DateRow],
) -> GoldTables {
    aggregate_at(facts, movie_genre, genres, dates, Utc::now())
}
