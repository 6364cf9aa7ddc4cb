//! Genre/Crew Splitter: delimited `genre` and `crew` strings into lists.

use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::parse::ParsedTable;
use crate::table::{RawTable, CREW_COLUMNS, GENRE_COLUMNS};

/// Character name given to a trailing crew token with no partner.
pub const SELF_CHARACTER: &str = "Self";

/// Role a crew member plays in a movie. Open-ended: anything not listed is
/// kept by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CrewRole {
    Actor,
    Director,
    Writer,
    Producer,
    Other(String),
}

impl CrewRole {
    /// Named roles in role-dimension order.
    pub fn known() -> [CrewRole; 4] {
        [
            CrewRole::Actor,
            CrewRole::Director,
            CrewRole::Writer,
            CrewRole::Producer,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            CrewRole::Actor => "Actor",
            CrewRole::Director => "Director",
            CrewRole::Writer => "Writer",
            CrewRole::Producer => "Producer",
            CrewRole::Other(name) => name,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "actor" => CrewRole::Actor,
            "director" => CrewRole::Director,
            "writer" => CrewRole::Writer,
            "producer" => CrewRole::Producer,
            _ => CrewRole::Other(name.trim().to_string()),
        }
    }
}

impl fmt::Display for CrewRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CrewRole {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One credited person of a movie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CrewPair {
    pub actor_name: String,
    pub character_name: String,
    pub role: CrewRole,
}

impl CrewPair {
    pub fn actor(actor_name: &str, character_name: &str) -> Self {
        Self {
            actor_name: actor_name.to_string(),
            character_name: character_name.to_string(),
            role: CrewRole::Actor,
        }
    }
}

/// Split on a comma followed by at least one whitespace character.
///
/// A comma with no following whitespace is part of the genre name.
pub fn split_genres(value: Option<&str>) -> Vec<String> {
    let Some(mut rest) = value else {
        return Vec::new();
    };

    let mut genres = Vec::new();
    loop {
        match find_genre_separator(rest) {
            Some((start, end)) => {
                push_genre(&mut genres, &rest[..start]);
                rest = &rest[end..];
            }
            None => {
                push_genre(&mut genres, rest);
                break;
            }
        }
    }
    genres
}

fn push_genre(genres: &mut Vec<String>, token: &str) {
    let token = token.trim();
    if !token.is_empty() {
        genres.push(token.to_string());
    }
}

/// Byte range of the next `,\s+` separator.
fn find_genre_separator(value: &str) -> Option<(usize, usize)> {
    let mut from = 0;
    while let Some(offset) = value[from..].find(',') {
        let comma = from + offset;
        let whitespace: usize = value[comma + 1..]
            .chars()
            .take_while(|c| c.is_whitespace())
            .map(char::len_utf8)
            .sum();
        if whitespace > 0 {
            return Some((comma, comma + 1 + whitespace));
        }
        from = comma + 1;
    }
    None
}

/// Pair `", "`-separated tokens positionally as (actor, character).
///
/// The format is trusted: out-of-order tokens pair up wrongly without error.
pub fn split_crew(value: Option<&str>) -> Vec<CrewPair> {
    let Some(crew) = value.filter(|v| !v.is_empty()) else {
        return Vec::new();
    };

    let tokens: Vec<&str> = crew.split(", ").collect();
    tokens
        .chunks(2)
        .map(|chunk| CrewPair::actor(chunk[0], chunk.get(1).copied().unwrap_or(SELF_CHARACTER)))
        .collect()
}

/// Parsed table plus per-row genre lists and crew pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct StagedTable {
    parsed: ParsedTable,
    genres: Vec<Vec<String>>,
    crews: Vec<Vec<CrewPair>>,
}

impl StagedTable {
    pub fn table(&self) -> &RawTable {
        self.parsed.table()
    }

    pub fn len(&self) -> usize {
        self.parsed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parsed.is_empty()
    }

    pub fn name(&self, row: usize) -> Option<&str> {
        self.parsed.name(row)
    }

    pub fn release_date(&self, row: usize) -> Option<NaiveDate> {
        self.parsed.release_date(row)
    }

    pub fn genres(&self, row: usize) -> &[String] {
        self.genres.get(row).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn crew(&self, row: usize) -> &[CrewPair] {
        self.crews.get(row).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Genre/Crew Splitter step. Missing `genre` / `crew` columns give empty lists.
pub fn split_genre_and_crew(parsed: ParsedTable) -> StagedTable {
    let table = parsed.table();
    let genre_column = table.find_column(GENRE_COLUMNS).map(|(idx, _)| idx);
    let crew_column = table.find_column(CREW_COLUMNS).map(|(idx, _)| idx);

    let genres: Vec<Vec<String>> = (0..table.len())
        .map(|row| split_genres(genre_column.and_then(|col| table.cell(row, col))))
        .collect();
    let crews: Vec<Vec<CrewPair>> = (0..table.len())
        .map(|row| split_crew(crew_column.and_then(|col| table.cell(row, col))))
        .collect();

    debug!(
        genre_entries = genres.iter().map(Vec::len).sum::<usize>(),
        crew_entries = crews.iter().map(Vec::len).sum::<usize>(),
        "split genre and crew"
    );

    StagedTable {
        parsed,
        genres,
        crews,
    }
}
