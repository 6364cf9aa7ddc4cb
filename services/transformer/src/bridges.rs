//! Bridge Builder: movie↔genre and movie↔crew association tables.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{info, warn};

use crate::config::ReferencePolicy;
use crate::dimensions::Dimensions;
use crate::error::TransformError;
use crate::keys::surrogate_id;

pub const MOVIE_GENRE_TABLE: &str = "bridge_movie_genre";
pub const MOVIE_CREW_TABLE: &str = "bridge_movie_crew";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieGenreRow {
    pub movie_genre_id: u32,
    pub movie_id: u32,
    pub genre_id: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovieCrewRow {
    pub movie_crew_id: u32,
    pub movie_id: u32,
    pub crew_id: u32,
    pub role_id: u32,
    pub character_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Bridges {
    pub movie_genre: Vec<MovieGenreRow>,
    pub movie_crew: Vec<MovieCrewRow>,
    /// Exploded entries dropped because a key did not resolve.
    pub dropped: usize,
}

/// Either drop-and-count or fail, depending on the policy.
fn unresolved(
    policy: ReferencePolicy,
    dropped: &mut usize,
    table: &'static str,
    movie_id: u32,
    key: &str,
) -> Result<(), TransformError> {
    match policy {
        ReferencePolicy::Strict => Err(TransformError::UnresolvedReference {
            table,
            movie_id,
            key: key.to_string(),
        }),
        ReferencePolicy::Lenient => {
            *dropped += 1;
            Ok(())
        }
    }
}

/// One row per distinct (movie, genre) pair; empty genre names are skipped.
pub fn build_movie_genre_bridge(
    dims: &Dimensions,
    policy: ReferencePolicy,
) -> Result<(Vec<MovieGenreRow>, usize), TransformError> {
    let genre_ids = dims.genre_ids();
    let mut seen: HashSet<(u32, u32)> = HashSet::new();
    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for movie in &dims.movie {
        for genre in movie.genres.iter().filter(|g| !g.is_empty()) {
            let Some(&genre_id) = genre_ids.get(genre.as_str()) else {
                unresolved(policy, &mut dropped, MOVIE_GENRE_TABLE, movie.movie_id, genre)?;
                continue;
            };
            if seen.insert((movie.movie_id, genre_id)) {
                rows.push(MovieGenreRow {
                    movie_genre_id: surrogate_id(rows.len()),
                    movie_id: movie.movie_id,
                    genre_id,
                });
            }
        }
    }

    Ok((rows, dropped))
}

/// One row per exploded crew pair, keyed by crew and role ids.
pub fn build_movie_crew_bridge(
    dims: &Dimensions,
    policy: ReferencePolicy,
) -> Result<(Vec<MovieCrewRow>, usize), TransformError> {
    let crew_ids = dims.crew_ids();
    let role_ids = dims.role_ids();
    let mut rows = Vec::new();
    let mut dropped = 0usize;

    for movie in &dims.movie {
        for pair in &movie.crew {
            let Some(&crew_id) = crew_ids.get(pair.actor_name.as_str()) else {
                unresolved(policy, &mut dropped, MOVIE_CREW_TABLE, movie.movie_id, &pair.actor_name)?;
                continue;
            };
            let Some(&role_id) = role_ids.get(&pair.role) else {
                unresolved(policy, &mut dropped, MOVIE_CREW_TABLE, movie.movie_id, pair.role.as_str())?;
                continue;
            };
            rows.push(MovieCrewRow {
                movie_crew_id: surrogate_id(rows.len()),
                movie_id: movie.movie_id,
                crew_id,
                role_id,
                character_name: pair.character_name.clone(),
            });
        }
    }

    Ok((rows, dropped))
}

/// Bridge Builder step.
pub fn build_bridges(dims: &Dimensions, policy: ReferencePolicy) -> Result<Bridges, TransformError> {
    let (movie_genre, genre_dropped) = build_movie_genre_bridge(dims, policy)?;
    let (movie_crew, crew_dropped) = build_movie_crew_bridge(dims, policy)?;
    let dropped = genre_dropped + crew_dropped;

    if dropped > 0 {
        warn!(
            genre_dropped,
            crew_dropped, "bridge rows with unresolved references dropped"
        );
    }
    info!(
        movie_genre = movie_genre.len(),
        movie_crew = movie_crew.len(),
        "built bridges"
    );

    Ok(Bridges {
        movie_genre,
        movie_crew,
        dropped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dimensions::{CrewRow, GenreRow, MovieRow, RoleRow};
    use crate::split::{CrewPair, CrewRole};
    use assert_matches::assert_matches;

    fn movie(movie_id: u32, genres: &[&str], crew: Vec<CrewPair>) -> MovieRow {
        MovieRow {
            movie_id,
            name: format!("Movie {}", movie_id),
            orig_title: None,
            overview: None,
            status: None,
            release_date: None,
            date_id: None,
            language_id: None,
            country_id: None,
            genres: genres.iter().map(|g| g.to_string()).collect(),
            crew,
            source_row: movie_id as usize - 1,
        }
    }

    fn dims() -> Dimensions {
        Dimensions {
            genre: vec![
                GenreRow { genre_id: 1, genre_name: "Drama".into() },
                GenreRow { genre_id: 2, genre_name: "Action".into() },
            ],
            crew: vec![
                CrewRow { crew_id: 1, crew_name: "Tom Hanks".into() },
                CrewRow { crew_id: 2, crew_name: "Robin Wright".into() },
            ],
            role: vec![RoleRow { role_id: 1, role: CrewRole::Actor }],
            movie: vec![
                movie(
                    1,
                    &["Drama", "Action", "Drama"],
                    vec![
                        CrewPair::actor("Tom Hanks", "Forrest Gump"),
                        CrewPair::actor("Robin Wright", "Jenny"),
                    ],
                ),
                movie(2, &["Drama", "Western"], vec![CrewPair::actor("Gary Sinise", "Dan")]),
            ],
            ..Dimensions::default()
        }
    }

    // -------------------------------------------------------------------------
    // MOVIE-GENRE
    // -------------------------------------------------------------------------

    #[test]
    fn test_movie_genre_bridge_resolves_and_dedups() {
        let (rows, dropped) = build_movie_genre_bridge(&dims(), ReferencePolicy::Lenient).unwrap();
        assert_eq!(
            rows,
            vec![
                MovieGenreRow { movie_genre_id: 1, movie_id: 1, genre_id: 1 },
                MovieGenreRow { movie_genre_id: 2, movie_id: 1, genre_id: 2 },
                MovieGenreRow { movie_genre_id: 3, movie_id: 2, genre_id: 1 },
            ]
        );
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_movie_genre_bridge_strict_fails() {
        let err = build_movie_genre_bridge(&dims(), ReferencePolicy::Strict).unwrap_err();
        assert_matches!(
            err,
            TransformError::UnresolvedReference { table: MOVIE_GENRE_TABLE, movie_id: 2, ref key } if key == "Western"
        );
    }

    // -------------------------------------------------------------------------
    // MOVIE-CREW
    // -------------------------------------------------------------------------

    #[test]
    fn test_movie_crew_bridge_resolves() {
        let (rows, dropped) = build_movie_crew_bridge(&dims(), ReferencePolicy::Lenient).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].crew_id, 2);
        assert_eq!(rows[1].role_id, 1);
        assert_eq!(rows[1].character_name, "Jenny");
        assert_eq!(dropped, 1);
    }

    #[test]
    fn test_movie_crew_bridge_unknown_role_dropped() {
        let mut d = dims();
        d.movie[0].crew[0].role = CrewRole::Director;
        let (rows, dropped) = build_movie_crew_bridge(&d, ReferencePolicy::Lenient).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].movie_crew_id, 1);
        assert_eq!(dropped, 2);
    }

    #[test]
    fn test_build_bridges_counts_all_drops() {
        let bridges = build_bridges(&dims(), ReferencePolicy::Lenient).unwrap();
        assert_eq!(bridges.dropped, 2);
    }

    #[test]
    fn test_bridge_foreign_ids_exist() {
        let d = dims();
        let bridges = build_bridges(&d, ReferencePolicy::Lenient).unwrap();
        for row in &bridges.movie_genre {
            assert!(d.movie.iter().any(|m| m.movie_id == row.movie_id));
            assert!(d.genre.iter().any(|g| g.genre_id == row.genre_id));
        }
        for row in &bridges.movie_crew {
            assert!(d.crew.iter().any(|c| c.crew_id == row.crew_id));
            assert!(d.role.iter().any(|r| r.role_id == row.role_id));
        }
    }
}
