//! User-facing texts.

use crate::models::{genre_suffix, FilmRecord};

const COMMANDS_OVERVIEW: &str = "Available commands:\n\
    /add - add a film\n\
    /list - your films\n\
    /recommend - recommendations\n\
    /help - help";

pub fn welcome() -> String {
    format!(
        "Hi! I keep track of the films you have watched.\n{}",
        COMMANDS_OVERVIEW
    )
}

/// Command overview preceded by the support contact, when one is configured
pub fn help(support_contact: Option<&str>) -> String {
    match support_contact {
        Some(contact) => format!(
            "Questions and feedback go to {}.\n\n{}",
            contact, COMMANDS_OVERVIEW
        ),
        None => format!(
            "Questions and feedback go to the bot maintainer.\n\n{}",
            COMMANDS_OVERVIEW
        ),
    }
}

pub fn text_hint() -> String {
    format!("I did not get that.\n{}", COMMANDS_OVERVIEW)
}

pub const UNKNOWN_COMMAND: &str = "Unknown command. Try /help.";
pub const NOTHING_TO_CANCEL: &str = "Nothing to cancel.";
pub const SESSION_EXPIRED: &str = "Session expired, please start over.";
pub const UNKNOWN_CHOICE: &str = "Unknown choice.";

// Add flow
pub const ASK_TITLE: &str = "Enter the film title:";
pub const FILM_NOT_FOUND: &str = "Film not found. Try again or /cancel.";
pub const SEARCH_FAILED: &str = "Film search failed. Try again or /cancel.";
pub const CHOOSE_SEARCH_RESULT: &str = "Choose the right film:";
pub const ADD_PICK_INVALID: &str = "Error: that film choice is not available. Start again with /add.";
pub const ALREADY_SAVED: &str = "This film is already in your list.";
pub const SAVE_FAILED: &str = "Could not save the film. Try again.";
pub const ADD_CANCELLED: &str = "Adding cancelled.";

pub fn film_added(film: &FilmRecord) -> String {
    format!("Film \"{}\"{} added!", film.title, genre_suffix(&film.genres))
}

// List flow
pub const LIST_EMPTY: &str = "Your film list is empty.";
pub const LIST_LOAD_FAILED: &str = "Could not load your film list. Try again.";
pub const LIST_HEADER: &str = "Your films:";
pub const UPDATED_LIST_HEADER: &str = "Updated film list:";
pub const DELETE_BUTTON: &str = "🗑️ Delete a film";
pub const CHOOSE_DELETE_TARGET: &str = "Choose a film to delete:";
pub const CANCEL_BUTTON: &str = "❌ Cancel";
pub const DELETE_TARGET_MISSING: &str = "Error: film not found.";
pub const DELETE_FAILED: &str = "Could not delete the film. Try again.";
pub const SHOW_UPDATED_LIST_BUTTON: &str = "📋 Show updated list";
pub const OFFER_UPDATED_LIST: &str = "Want to see the updated list?";
pub const LIST_NOW_EMPTY: &str = "Your film list is now empty.";
pub const LIST_CLOSED: &str = "List closed.";

/// Longest title shown on a delete button before truncation
const DELETE_LABEL_MAX_CHARS: usize = 30;

pub fn film_list(header: &str, films: &[FilmRecord]) -> String {
    let mut text = format!("{}\n", header);
    for (i, film) in films.iter().enumerate() {
        text.push_str(&format!(
            "{}. {}{}\n",
            i + 1,
            film.title,
            genre_suffix(&film.genres)
        ));
    }
    text
}

pub fn delete_label(title: &str) -> String {
    let shown = if title.chars().count() > DELETE_LABEL_MAX_CHARS {
        let cut: String = title.chars().take(DELETE_LABEL_MAX_CHARS).collect();
        format!("{}...", cut)
    } else {
        title.to_string()
    };
    format!("❌ {}", shown)
}

pub fn film_deleted(film: &FilmRecord) -> String {
    format!("Film '{}' removed from your list!", film.title)
}

// Recommend flow
pub const CHOOSE_MODE: &str = "What kind of recommendation are you interested in?";
pub const BY_FILM_BUTTON: &str = "By film";
pub const BY_GENRE_BUTTON: &str = "By genre";
pub const NO_FILMS_FOR_RECOMMENDATIONS: &str = "You have no films for recommendations.";
pub const CHOOSE_FILM: &str = "Choose a film:";
pub const CHOOSE_GENRE: &str = "Choose a genre:";
pub const GENRES_UNAVAILABLE: &str =
    "Could not load the genre list. Try again or pick another option.";
pub const NO_MORE_RECOMMENDATIONS: &str = "No more recommendations.";
pub const RECOMMENDATIONS_FAILED: &str = "Could not fetch recommendations. Try again.";
pub const RECOMMENDATIONS_CLOSED: &str = "Recommendations closed.";
pub const RECOMMENDATIONS_CANCELLED: &str = "Recommendations cancelled.";
pub const BACK_BUTTON: &str = "⬅️ Back";
pub const MORE_BUTTON: &str = "➡️ More";
pub const CLOSE_BUTTON: &str = "❌ Close";
pub const RETRY_BUTTON: &str = "🔄 Retry";

pub fn film_recommendations_header(title: &str) -> String {
    format!("Recommendations for the film \"{}\":\n\n", title)
}

pub fn genre_recommendations_header(genre: &str) -> String {
    format!("Recommendations for the genre \"{}\":\n\n", genre)
}

pub fn opening_film(url: &str) -> String {
    format!("Opening the film on TMDB:\n{}", url)
}
