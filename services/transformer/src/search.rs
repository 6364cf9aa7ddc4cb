//! Search documents: one denormalized record per movie, plus a filter to
//! query a document set offline.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::pipeline::SilverTables;

/// File name the binary uses when it writes documents next to the tables.
pub const DOCUMENTS_FILE: &str = "movie_documents.json";

pub const DEFAULT_LIMIT: usize = 10;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrewMember {
    pub name: String,
    pub role_name: String,
    pub character_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieDocument {
    pub id: u32,
    pub name: String,
    pub orig_title: Option<String>,
    pub overview: Option<String>,
    pub status: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub genres: Vec<String>,
    pub crew: Vec<CrewMember>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub budget: Option<f64>,
    pub revenue: Option<f64>,
    pub score: Option<f64>,
    pub profit: Option<f64>,
    #[serde(default)]
    pub is_deleted: bool,
}

fn lookup(names: &HashMap<u32, &str>, id: Option<u32>) -> Option<String> {
    id.and_then(|id| names.get(&id)).map(|name| name.to_string())
}

/// Denormalize silver tables into one document per movie, in movie order.
pub fn build_documents(silver: &SilverTables) -> Vec<MovieDocument> {
    let d = &silver.dimensions;

    let genre_names: HashMap<u32, &str> = d.genre.iter().map(|g| (g.genre_id, g.genre_name.as_str())).collect();
    let crew_names: HashMap<u32, &str> = d.crew.iter().map(|c| (c.crew_id, c.crew_name.as_str())).collect();
    let role_names: HashMap<u32, &str> = d.role.iter().map(|r| (r.role_id, r.role.as_str())).collect();
    let countries: HashMap<u32, &str> = d.country.iter().map(|c| (c.country_id, c.country_name.as_str())).collect();
    let languages: HashMap<u32, &str> = d.language.iter().map(|l| (l.language_id, l.language_name.as_str())).collect();
    let facts: HashMap<u32, _> = silver
        .fact_movie_performance
        .iter()
        .map(|f| (f.movie_id, f))
        .collect();

    let mut genres_by_movie: HashMap<u32, Vec<String>> = HashMap::new();
    for link in &silver.bridges.movie_genre {
        if let Some(&name) = genre_names.get(&link.genre_id) {
            genres_by_movie.entry(link.movie_id).or_default().push(name.to_string());
        }
    }

    let mut crew_by_movie: HashMap<u32, Vec<CrewMember>> = HashMap::new();
    for link in &silver.bridges.movie_crew {
        let (Some(&name), Some(&role)) = (crew_names.get(&link.crew_id), role_names.get(&link.role_id)) else {
            continue;
        };
        crew_by_movie.entry(link.movie_id).or_default().push(CrewMember {
            name: name.to_string(),
            role_name: role.to_string(),
            character_name: link.character_name.clone(),
        });
    }

    let documents: Vec<MovieDocument> = d
        .movie
        .iter()
        .map(|movie| {
            let fact = facts.get(&movie.movie_id);
            MovieDocument {
                id: movie.movie_id,
                name: movie.name.clone(),
                orig_title: movie.orig_title.clone(),
                overview: movie.overview.clone(),
                status: movie.status.clone(),
                release_date: movie.release_date,
                genres: genres_by_movie.remove(&movie.movie_id).unwrap_or_default(),
                crew: crew_by_movie.remove(&movie.movie_id).unwrap_or_default(),
                country: lookup(&countries, movie.country_id),
                language: lookup(&languages, movie.language_id),
                budget: fact.and_then(|f| f.budget),
                revenue: fact.and_then(|f| f.revenue),
                score: fact.and_then(|f| f.score),
                profit: fact.and_then(|f| f.profit),
                is_deleted: false,
            }
        })
        .collect();

    debug!(documents = documents.len(), "built search documents");
    documents
}

/// Offline query over search documents.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MovieFilter {
    /// Case-insensitive substring of name, original title or overview.
    pub query: Option<String>,
    pub country: Option<String>,
    pub language: Option<String>,
    pub min_score: Option<f64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub offset: usize,
    pub limit: Option<usize>,
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.is_some_and(|h| h.to_lowercase().contains(needle))
}

fn equals_ci(value: Option<&str>, expected: &str) -> bool {
    value.is_some_and(|v| v.eq_ignore_ascii_case(expected.trim()))
}

impl MovieFilter {
    /// Requested page size, defaulted and capped.
    pub fn effective_limit(&self) -> usize {
        self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT)
    }

    pub fn matches(&self, doc: &MovieDocument) -> bool {
        if doc.is_deleted {
            return false;
        }
        if let Some(query) = self.query.as_deref().map(|q| q.trim().to_lowercase()) {
            if !query.is_empty()
                && !contains_ci(Some(doc.name.as_str()), &query)
                && !contains_ci(doc.orig_title.as_deref(), &query)
                && !contains_ci(doc.overview.as_deref(), &query)
            {
                return false;
            }
        }
        if let Some(country) = &self.country {
            if !equals_ci(doc.country.as_deref(), country) {
                return false;
            }
        }
        if let Some(language) = &self.language {
            if !equals_ci(doc.language.as_deref(), language) {
                return false;
            }
        }
        if let Some(min) = self.min_score {
            if !doc.score.is_some_and(|s| s >= min) {
                return false;
            }
        }
        if self.from.is_some() || self.to.is_some() {
            let Some(date) = doc.release_date else {
                return false;
            };
            if self.from.is_some_and(|from| date < from) || self.to.is_some_and(|to| date > to) {
                return false;
            }
        }
        true
    }

    /// Matching documents in input order, paged by offset and limit.
    pub fn apply<'a>(&self, documents: &'a [MovieDocument]) -> Vec<&'a MovieDocument> {
        documents
            .iter()
            .filter(|doc| self.matches(doc))
            .skip(self.offset)
            .take(self.effective_limit())
            .collect()
    }
}
