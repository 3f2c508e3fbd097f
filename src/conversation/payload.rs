use std::fmt::Display;
use std::str::FromStr;

use crate::error::AppError;
use crate::models::FilmId;

/// Which source the recommend flow draws candidates from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecommendMode {
    ByFilm,
    ByGenre,
}

/// Callback payload carried by an inline button
///
/// The wire strings are kept stable so buttons sent before a restart still
/// parse; whether they can still be served depends on the live session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    ShowDeleteInterface,
    CancelDelete,
    ShowUpdatedList,
    /// Index into the list snapshot
    Delete(usize),
    Mode(RecommendMode),
    FilmPage(u32),
    MoreFilm,
    GenrePage(u32),
    MoreGenre,
    CloseRecommendations,
    OpenRecommendation(FilmId),
    /// Bare number: a list index or a genre id, depending on the session
    Pick(u64),
}

impl Display for Payload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Payload::ShowDeleteInterface => write!(f, "show_delete_interface"),
            Payload::CancelDelete => write!(f, "cancel_delete"),
            Payload::ShowUpdatedList => write!(f, "show_updated_list"),
            Payload::Delete(index) => write!(f, "delete_{}", index),
            Payload::Mode(RecommendMode::ByFilm) => write!(f, "by_film"),
            Payload::Mode(RecommendMode::ByGenre) => write!(f, "by_genre"),
            Payload::FilmPage(page) => write!(f, "film_page_{}", page),
            Payload::MoreFilm => write!(f, "more_film"),
            Payload::GenrePage(page) => write!(f, "genre_page_{}", page),
            Payload::MoreGenre => write!(f, "more_genre"),
            Payload::CloseRecommendations => write!(f, "close_recommendations"),
            Payload::OpenRecommendation(id) => write!(f, "add_rec_{}", id),
            Payload::Pick(n) => write!(f, "{}", n),
        }
    }
}

impl FromStr for Payload {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || AppError::InvalidSelection(format!("Malformed payload: {}", s));

        let payload = match s {
            "show_delete_interface" => Payload::ShowDeleteInterface,
            "cancel_delete" => Payload::CancelDelete,
            "show_updated_list" => Payload::ShowUpdatedList,
            "by_film" => Payload::Mode(RecommendMode::ByFilm),
            "by_genre" => Payload::Mode(RecommendMode::ByGenre),
            "more_film" => Payload::MoreFilm,
            "more_genre" => Payload::MoreGenre,
            "close_recommendations" => Payload::CloseRecommendations,
            _ => {
                if let Some(index) = s.strip_prefix("delete_") {
                    Payload::Delete(index.parse().map_err(|_| malformed())?)
                } else if let Some(page) = s.strip_prefix("film_page_") {
                    Payload::FilmPage(page.parse().map_err(|_| malformed())?)
                } else if let Some(page) = s.strip_prefix("genre_page_") {
                    Payload::GenrePage(page.parse().map_err(|_| malformed())?)
                } else if let Some(id) = s.strip_prefix("add_rec_") {
                    Payload::OpenRecommendation(id.parse().map_err(|_| malformed())?)
                } else if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
                    Payload::Pick(s.parse().map_err(|_| malformed())?)
                } else {
                    return Err(malformed());
                }
            }
        };

        Ok(payload)
    }
}
