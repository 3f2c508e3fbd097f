//! Film metadata provider abstraction
//!
//! The conversation engine only talks to this trait, so the TMDB client can be
//! swapped for a fake or a mock. Every implementation must surface transport
//! problems as `AppError::MetadataUnavailable` and report "nothing found" as
//! an empty list.

use crate::{
    error::AppResult,
    models::{Candidate, FilmId, GenreId, GenreTaxonomy},
};

pub mod tmdb;

pub use tmdb::TmdbClient;

#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Search films by title
    async fn search(&self, title: &str) -> AppResult<Vec<Candidate>>;

    /// Genre taxonomy, loaded once and cached for the process lifetime
    ///
    /// Never fails: a failed fetch yields an empty mapping and is retried on
    /// the next call.
    async fn genres(&self) -> GenreTaxonomy;

    /// One upstream page of recommendations based on a film
    async fn recommendations_for_film(
        &self,
        film_id: FilmId,
        page: u32,
    ) -> AppResult<Vec<Candidate>>;

    /// One upstream page of films in a genre
    async fn recommendations_for_genre(
        &self,
        genre_id: GenreId,
        page: u32,
    ) -> AppResult<Vec<Candidate>>;
}
