//! Dimension Builder: deduplicated reference tables with surrogate ids.
//!
//! Every dimension is deduplicated in first-appearance order and numbered
//! densely from 1, so the same staged table always yields the same ids.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::TransformError;
use crate::keys::KeyAssigner;
use crate::split::{CrewPair, CrewRole, StagedTable};
use crate::table::{
    COUNTRY_COLUMNS, LANGUAGE_COLUMNS, ORIGINAL_TITLE_COLUMNS, OVERVIEW_COLUMNS, STATUS_COLUMNS,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRow {
    pub date_id: u32,
    pub release_date: NaiveDate,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub quarter: u32,
}

impl DateRow {
    pub fn new(date_id: u32, release_date: NaiveDate) -> Self {
        let month = release_date.month();
        Self {
            date_id,
            release_date,
            year: release_date.year(),
            month,
            day: release_date.day(),
            quarter: quarter_of(month),
        }
    }
}

/// Calendar quarter (1-4) of a 1-based month.
pub fn quarter_of(month: u32) -> u32 {
    (month - 1) / 3 + 1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenreRow {
    pub genre_id: u32,
    pub genre_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageRow {
    pub language_id: u32,
    pub language_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryRow {
    pub country_id: u32,
    pub country_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MovieRow {
    pub movie_id: u32,
    pub name: String,
    pub orig_title: Option<String>,
    pub overview: Option<String>,
    pub status: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub date_id: Option<u32>,
    pub language_id: Option<u32>,
    pub country_id: Option<u32>,
    /// Genre list of the movie, exploded by the bridge builder.
    #[serde(skip)]
    pub genres: Vec<String>,
    /// Crew pairs of the movie, exploded by the bridge builder.
    #[serde(skip)]
    pub crew: Vec<CrewPair>,
    /// Staged row this movie was first seen at.
    #[serde(skip)]
    pub source_row: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CrewRow {
    pub crew_id: u32,
    pub crew_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleRow {
    pub role_id: u32,
    pub role: CrewRole,
}

/// Natural key of a movie: name, original title and release date.
pub type MovieKey = (String, Option<String>, Option<NaiveDate>);

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dimensions {
    pub date: Vec<DateRow>,
    pub genre: Vec<GenreRow>,
    pub language: Vec<LanguageRow>,
    pub country: Vec<CountryRow>,
    pub movie: Vec<MovieRow>,
    pub crew: Vec<CrewRow>,
    pub role: Vec<RoleRow>,
}

impl Dimensions {
    pub fn genre_ids(&self) -> HashMap<&str, u32> {
        self.genre
            .iter()
            .map(|g| (g.genre_name.as_str(), g.genre_id))
            .collect()
    }

    pub fn crew_ids(&self) -> HashMap<&str, u32> {
        self.crew
            .iter()
            .map(|c| (c.crew_name.as_str(), c.crew_id))
            .collect()
    }

    pub fn role_ids(&self) -> HashMap<&CrewRole, u32> {
        self.role.iter().map(|r| (&r.role, r.role_id)).collect()
    }
}

// =============================================================================
// Single-column dimensions
// =============================================================================

pub fn build_date_dimension(staged: &StagedTable) -> Vec<DateRow> {
    let mut dates = KeyAssigner::new();
    for row in 0..staged.len() {
        if let Some(date) = staged.release_date(row) {
            dates.assign(date);
        }
    }
    dates
        .into_entries()
        .map(|(id, date)| DateRow::new(id, date))
        .collect()
}

/// Genre lists exploded across rows, then deduplicated.
pub fn build_genre_dimension(staged: &StagedTable) -> Vec<GenreRow> {
    let mut genres = KeyAssigner::new();
    for row in 0..staged.len() {
        for genre in staged.genres(row) {
            if !genre.is_empty() {
                genres.assign(genre.clone());
            }
        }
    }
    genres
        .into_entries()
        .map(|(genre_id, genre_name)| GenreRow {
            genre_id,
            genre_name,
        })
        .collect()
}

/// Unique non-missing values of the first present candidate column.
fn distinct_values(
    staged: &StagedTable,
    column: &'static str,
    candidates: &'static [&'static str],
) -> Result<KeyAssigner<String>, TransformError> {
    let table = staged.table();
    let idx = table.require_column(column, candidates)?;
    let mut values = KeyAssigner::new();
    for row in 0..table.len() {
        if let Some(value) = table.cell(row, idx) {
            values.assign(value.trim().to_string());
        }
    }
    Ok(values)
}

pub fn build_language_dimension(staged: &StagedTable) -> Result<Vec<LanguageRow>, TransformError> {
    Ok(distinct_values(staged, "language", LANGUAGE_COLUMNS)?
        .into_entries()
        .map(|(language_id, language_name)| LanguageRow {
            language_id,
            language_name,
        })
        .collect())
}

pub fn build_country_dimension(staged: &StagedTable) -> Result<Vec<CountryRow>, TransformError> {
    Ok(distinct_values(staged, "country", COUNTRY_COLUMNS)?
        .into_entries()
        .map(|(country_id, country_name)| CountryRow {
            country_id,
            country_name,
        })
        .collect())
}

// =============================================================================
// Movie dimension
// =============================================================================

/// Unique movies left-joined to the date, language and country dimensions.
///
/// Rows without a name are skipped. The first row of each movie key supplies
/// the descriptive attributes.
pub fn build_movie_dimension(
    staged: &StagedTable,
    dates: &[DateRow],
    languages: &[LanguageRow],
    countries: &[CountryRow],
) -> Result<Vec<MovieRow>, TransformError> {
    let table = staged.table();
    let language_col = table.require_column("language", LANGUAGE_COLUMNS)?;
    let country_col = table.require_column("country", COUNTRY_COLUMNS)?;
    let title_col = table.find_column(ORIGINAL_TITLE_COLUMNS).map(|(idx, _)| idx);
    let overview_col = table.find_column(OVERVIEW_COLUMNS).map(|(idx, _)| idx);
    let status_col = table.find_column(STATUS_COLUMNS).map(|(idx, _)| idx);

    let date_ids: HashMap<NaiveDate, u32> =
        dates.iter().map(|d| (d.release_date, d.date_id)).collect();
    let language_ids: HashMap<&str, u32> = languages
        .iter()
        .map(|l| (l.language_name.as_str(), l.language_id))
        .collect();
    let country_ids: HashMap<&str, u32> = countries
        .iter()
        .map(|c| (c.country_name.as_str(), c.country_id))
        .collect();

    let text = |row: usize, col: Option<usize>| -> Option<String> {
        col.and_then(|c| table.cell(row, c))
            .map(|v| v.trim().to_string())
    };

    let mut keys: KeyAssigner<MovieKey> = KeyAssigner::new();
    let mut movies = Vec::new();
    let mut unnamed = 0usize;

    for row in 0..staged.len() {
        let Some(name) = staged.name(row) else {
            unnamed += 1;
            continue;
        };
        let release_date = staged.release_date(row);
        let orig_title = text(row, title_col);
        let key: MovieKey = (name.to_string(), orig_title.clone(), release_date);

        let seen = keys.len();
        let movie_id = keys.assign(key);
        if keys.len() == seen {
            continue;
        }

        movies.push(MovieRow {
            movie_id,
            name: name.to_string(),
            orig_title,
            overview: text(row, overview_col),
            status: text(row, status_col),
            release_date,
            date_id: release_date.and_then(|d| date_ids.get(&d).copied()),
            language_id: table
                .cell(row, language_col)
                .and_then(|v| language_ids.get(v.trim()).copied()),
            country_id: table
                .cell(row, country_col)
                .and_then(|v| country_ids.get(v.trim()).copied()),
            genres: staged.genres(row).to_vec(),
            crew: staged.crew(row).to_vec(),
            source_row: row,
        });
    }

    if unnamed > 0 {
        warn!(unnamed, "rows without a movie name skipped");
    }
    Ok(movies)
}

// =============================================================================
// Crew and role dimensions
// =============================================================================

/// Unique crew names across every movie's crew pairs.
pub fn build_crew_dimension(movies: &[MovieRow]) -> Vec<CrewRow> {
    let mut crew = KeyAssigner::new();
    for pair in movies.iter().flat_map(|m| m.crew.iter()) {
        crew.assign(pair.actor_name.clone());
    }
    crew.into_entries()
        .map(|(crew_id, crew_name)| CrewRow { crew_id, crew_name })
        .collect()
}

/// Named roles in a fixed order, followed by any other role observed across
/// the movies' crew pairs.
pub fn build_role_dimension(movies: &[MovieRow]) -> Vec<RoleRow> {
    let mut roles = KeyAssigner::new();
    for role in CrewRole::known() {
        roles.assign(role);
    }
    for pair in movies.iter().flat_map(|m| m.crew.iter()) {
        roles.assign(pair.role.clone());
    }
    roles
        .into_entries()
        .map(|(role_id, role)| RoleRow { role_id, role })
        .collect()
}

/// Dimension Builder step.
pub fn build_dimensions(staged: &StagedTable) -> Result<Dimensions, TransformError> {
    let date = build_date_dimension(staged);
    let genre = build_genre_dimension(staged);
    let language = build_language_dimension(staged)?;
    let country = build_country_dimension(staged)?;
    let movie = build_movie_dimension(staged, &date, &language, &country)?;
    let crew = build_crew_dimension(&movie);
    let role = build_role_dimension(&movie);

    info!(
        dates = date.len(),
        genres = genre.len(),
        languages = language.len(),
        countries = country.len(),
        movies = movie.len(),
        crew = crew.len(),
        roles = role.len(),
        "built dimensions"
    );

    Ok(Dimensions {
        date,
        genre,
        language,
        country,
        movie,
        crew,
        role,
    })
}
