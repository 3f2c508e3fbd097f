use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod event;

pub use event::{
    ButtonAction, InboundEvent, InlineButton, Keyboard, MessageRef, MessageTarget,
    OutboundMessage,
};

/// Transport-provided user identity
pub type UserId = String;
/// External (TMDB) film identifier
pub type FilmId = u64;
/// External (TMDB) genre identifier
pub type GenreId = u64;

/// Genre id → display name, as published by the metadata service
pub type GenreTaxonomy = BTreeMap<GenreId, String>;

/// Every user's saved films, keyed by user id
pub type FilmCatalog = BTreeMap<UserId, Vec<FilmRecord>>;

/// A film confirmed and persisted in a user's watch log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilmRecord {
    pub id: FilmId,
    pub title: String,
    #[serde(default)]
    pub genres: Vec<String>,
}

impl FilmRecord {
    /// Builds a record from a search candidate, resolving genre names via the taxonomy
    pub fn from_candidate(candidate: &Candidate, taxonomy: &GenreTaxonomy) -> Self {
        Self {
            id: candidate.id,
            title: candidate.title.clone(),
            genres: genre_names(&candidate.genre_ids, taxonomy),
        }
    }
}

/// A film returned by search or recommendation queries, not yet saved
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Candidate {
    pub id: FilmId,
    pub title: String,
    pub release_year: Option<i32>,
    pub genre_ids: Vec<GenreId>,
}

impl Candidate {
    /// Pick-list label: `Title (1999)`, or just the title when the year is unknown
    pub fn label(&self) -> String {
        match self.release_year {
            Some(year) => format!("{} ({})", self.title, year),
            None => self.title.clone(),
        }
    }
}

/// Resolves genre ids to names, skipping ids the taxonomy does not know
pub fn genre_names(ids: &[GenreId], taxonomy: &GenreTaxonomy) -> Vec<String> {
    ids.iter()
        .filter_map(|id| taxonomy.get(id))
        .cloned()
        .collect()
}

/// Formats genre names as a ` (a, b)` suffix, empty when there are none
pub fn genre_suffix(names: &[String]) -> String {
    if names.is_empty() {
        String::new()
    } else {
        format!(" ({})", names.join(", "))
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Film entry in TMDB search, recommendation and discover responses
#[derive(Debug, Clone, Deserialize)]
pub struct ApiMovie {
    pub id: FilmId,
    pub title: String,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<GenreId>,
}

impl From<ApiMovie> for Candidate {
    fn from(movie: ApiMovie) -> Self {
        let release_year = movie
            .release_date
            .as_deref()
            .and_then(|date| NaiveDate::parse_from_str(date, "%Y-%m-%d").ok())
            .map(|date| date.year());

        Candidate {
            id: movie.id,
            title: movie.title,
            release_year,
            genre_ids: movie.genre_ids,
        }
    }
}

/// Paginated TMDB response carrying a `results` array
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResultsPage {
    #[serde(default)]
    pub results: Vec<ApiMovie>,
}

/// TMDB `genre/movie/list` response
#[derive(Debug, Clone, Deserialize)]
pub struct ApiGenreList {
    #[serde(default)]
    pub genres: Vec<ApiGenre>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiGenre {
    pub id: GenreId,
    pub name: String,
}

impl From<ApiGenreList> for GenreTaxonomy {
    fn from(list: ApiGenreList) -> Self {
        list.genres.into_iter().map(|g| (g.id, g.name)).collect()
    }
}
