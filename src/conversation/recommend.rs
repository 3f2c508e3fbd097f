use std::collections::HashSet;

use crate::{
    context::AppContext,
    conversation::{messages, Outbox, Payload, RecommendMode},
    error::AppError,
    models::{
        genre_names, genre_suffix, Candidate, FilmId, FilmRecord, GenreId, GenreTaxonomy,
        InlineButton, Keyboard, MessageRef,
    },
    services::recommendations::{film_page_window, select_film_page, select_genre_page},
};

/// Recommendation conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecommendFlow {
    ChoosingMode,
    /// Saved films offered as recommendation seeds
    FilmPick { films: Vec<FilmRecord> },
    FilmBrowsing { film: FilmRecord, page: u32 },
    /// Genres offered, as fetched when the pick-list was built
    GenrePick { genres: GenreTaxonomy },
    GenreBrowsing {
        genre_id: GenreId,
        genre_name: String,
        page: u32,
    },
}

impl RecommendFlow {
    pub fn start(out: &mut Outbox) -> Self {
        out.reply(messages::CHOOSE_MODE, Some(mode_keyboard()));
        RecommendFlow::ChoosingMode
    }

    pub async fn choose_mode(
        ctx: &AppContext,
        user_id: &str,
        mode: RecommendMode,
        message_ref: MessageRef,
        out: &mut Outbox,
    ) -> Option<RecommendFlow> {
        match mode {
            RecommendMode::ByFilm => {
                let films = match ctx.store.films(user_id).await {
                    Ok(films) => films,
                    Err(e) => {
                        tracing::error!(user_id = %user_id, error = %e, "Failed to load films");
                        out.edit(message_ref, messages::LIST_LOAD_FAILED, None);
                        return None;
                    }
                };

                if films.is_empty() {
                    out.edit(message_ref, messages::NO_FILMS_FOR_RECOMMENDATIONS, None);
                    return None;
                }

                let buttons = films
                    .iter()
                    .enumerate()
                    .map(|(i, film)| InlineButton::callback(&film.title, Payload::Pick(i as u64)))
                    .collect();
                out.edit(message_ref, messages::CHOOSE_FILM, Some(Keyboard::column(buttons)));
                Some(RecommendFlow::FilmPick { films })
            }
            RecommendMode::ByGenre => {
                let genres = ctx.metadata.genres().await;

                if genres.is_empty() {
                    out.edit(message_ref, messages::GENRES_UNAVAILABLE, Some(mode_keyboard()));
                    return Some(RecommendFlow::ChoosingMode);
                }

                let buttons = genres
                    .iter()
                    .map(|(id, name)| InlineButton::callback(name, Payload::Pick(*id)))
                    .collect();
                out.edit(message_ref, messages::CHOOSE_GENRE, Some(Keyboard::column(buttons)));
                Some(RecommendFlow::GenrePick { genres })
            }
        }
    }

    /// Starts film-based browsing at page 1 from the picked seed film
    pub async fn pick_film(
        ctx: &AppContext,
        user_id: &str,
        films: Vec<FilmRecord>,
        index: u64,
        message_ref: MessageRef,
        out: &mut Outbox,
    ) -> Option<RecommendFlow> {
        let film = usize::try_from(index)
            .ok()
            .and_then(|i| films.into_iter().nth(i));

        match film {
            Some(film) => Self::browse_film(ctx, user_id, film, 1, message_ref, out).await,
            None => {
                let error = AppError::InvalidSelection(format!("seed film {}", index));
                tracing::warn!(user_id = %user_id, error = %error, "Invalid film pick");
                out.edit(message_ref, messages::UNKNOWN_CHOICE, None);
                None
            }
        }
    }

    /// Renders one UI page of recommendations based on `film`
    pub async fn browse_film(
        ctx: &AppContext,
        user_id: &str,
        film: FilmRecord,
        page: u32,
        message_ref: MessageRef,
        out: &mut Outbox,
    ) -> Option<RecommendFlow> {
        let page = page.max(1);
        let window = film_page_window(page);

        tracing::info!(
            user_id = %user_id,
            film_id = film.id,
            page,
            upstream_page = window.upstream_page,
            "Fetching film recommendations"
        );

        match ctx
            .metadata
            .recommendations_for_film(film.id, window.upstream_page)
            .await
        {
            Ok(results) => {
                let seen = seen_ids(ctx, user_id).await;
                let shown = select_film_page(&results, &seen, window.offset);
                let nav = Navigation {
                    page,
                    back: Payload::FilmPage(page - 1),
                    more: Payload::MoreFilm,
                };
                let header = messages::film_recommendations_header(&film.title);
                render_page(ctx, &header, &shown, nav, message_ref, out).await;
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, film_id = film.id, error = %e, "Film recommendations failed");
                out.edit(
                    message_ref,
                    messages::RECOMMENDATIONS_FAILED,
                    Some(retry_keyboard(Payload::FilmPage(page))),
                );
            }
        }

        Some(RecommendFlow::FilmBrowsing { film, page })
    }

    /// Starts genre-based browsing at page 1 for a genre of the offered list
    pub async fn pick_genre(
        ctx: &AppContext,
        user_id: &str,
        genres: GenreTaxonomy,
        genre_id: GenreId,
        message_ref: MessageRef,
        out: &mut Outbox,
    ) -> Option<RecommendFlow> {
        match genres.get(&genre_id) {
            Some(name) => {
                Self::browse_genre(ctx, user_id, genre_id, name.clone(), 1, message_ref, out).await
            }
            None => {
                let error = AppError::InvalidSelection(format!("genre {}", genre_id));
                tracing::warn!(user_id = %user_id, error = %error, "Invalid genre pick");
                out.edit(message_ref, messages::UNKNOWN_CHOICE, None);
                None
            }
        }
    }

    /// Renders one page of films in a genre
    ///
    /// Unlike film browsing, the UI page is used as the upstream page directly.
    pub async fn browse_genre(
        ctx: &AppContext,
        user_id: &str,
        genre_id: GenreId,
        genre_name: String,
        page: u32,
        message_ref: MessageRef,
        out: &mut Outbox,
    ) -> Option<RecommendFlow> {
        let page = page.max(1);

        tracing::info!(user_id = %user_id, genre_id, page, "Fetching genre recommendations");

        match ctx.metadata.recommendations_for_genre(genre_id, page).await {
            Ok(results) => {
                let seen = seen_ids(ctx, user_id).await;
                let shown = select_genre_page(&results, &seen);
                let nav = Navigation {
                    page,
                    back: Payload::GenrePage(page - 1),
                    more: Payload::MoreGenre,
                };
                let header = messages::genre_recommendations_header(&genre_name);
                render_page(ctx, &header, &shown, nav, message_ref, out).await;
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, genre_id, error = %e, "Genre recommendations failed");
                out.edit(
                    message_ref,
                    messages::RECOMMENDATIONS_FAILED,
                    Some(retry_keyboard(Payload::GenrePage(page))),
                );
            }
        }

        Some(RecommendFlow::GenreBrowsing {
            genre_id,
            genre_name,
            page,
        })
    }

    pub fn close(message_ref: MessageRef, out: &mut Outbox) {
        out.edit(message_ref, messages::RECOMMENDATIONS_CLOSED, None);
    }

    pub fn cancel(out: &mut Outbox) {
        out.reply(messages::RECOMMENDATIONS_CANCELLED, Some(Keyboard::command_bar()));
    }

    /// Answers a tapped recommendation link with the film page
    pub fn open_film(ctx: &AppContext, film_id: FilmId, out: &mut Outbox) {
        out.reply(
            messages::opening_film(&ctx.film_url(film_id)),
            Some(Keyboard::command_bar()),
        );
    }
}

/// Navigation payloads of one browsing page
struct Navigation {
    page: u32,
    back: Payload,
    more: Payload,
}

fn mode_keyboard() -> Keyboard {
    Keyboard::inline(vec![vec![
        InlineButton::callback(messages::BY_FILM_BUTTON, Payload::Mode(RecommendMode::ByFilm)),
        InlineButton::callback(messages::BY_GENRE_BUTTON, Payload::Mode(RecommendMode::ByGenre)),
    ]])
}

fn close_button() -> InlineButton {
    InlineButton::callback(messages::CLOSE_BUTTON, Payload::CloseRecommendations)
}

fn retry_keyboard(retry: Payload) -> Keyboard {
    Keyboard::inline(vec![vec![
        InlineButton::callback(messages::RETRY_BUTTON, retry),
        close_button(),
    ]])
}

/// Ids of the films the user already saved; empty when the store fails
async fn seen_ids(ctx: &AppContext, user_id: &str) -> HashSet<FilmId> {
    match ctx.store.films(user_id).await {
        Ok(films) => films.into_iter().map(|f| f.id).collect(),
        Err(e) => {
            tracing::warn!(user_id = %user_id, error = %e, "Could not load saved films for filtering");
            HashSet::new()
        }
    }
}

async fn render_page(
    ctx: &AppContext,
    header: &str,
    shown: &[Candidate],
    nav: Navigation,
    message_ref: MessageRef,
    out: &mut Outbox,
) {
    if shown.is_empty() {
        out.edit(
            message_ref,
            messages::NO_MORE_RECOMMENDATIONS,
            Some(Keyboard::inline(vec![vec![close_button()]])),
        );
        return;
    }

    let taxonomy = ctx.metadata.genres().await;
    let mut text = header.to_string();
    let mut rows = Vec::with_capacity(shown.len() + 1);

    for (i, candidate) in shown.iter().enumerate() {
        let genres = genre_names(&candidate.genre_ids, &taxonomy);
        text.push_str(&format!("{}. {}{}\n", i + 1, candidate.title, genre_suffix(&genres)));
        rows.push(vec![InlineButton::url(
            format!("{}. {}", i + 1, candidate.title),
            ctx.film_url(candidate.id),
        )]);
    }

    let mut nav_row = Vec::with_capacity(3);
    if nav.page > 1 {
        nav_row.push(InlineButton::callback(messages::BACK_BUTTON, nav.back));
    }
    nav_row.push(InlineButton::callback(messages::MORE_BUTTON, nav.more));
    nav_row.push(close_button());
    rows.push(nav_row);

    out.edit(message_ref, text, Some(Keyboard::inline(rows)));
}
