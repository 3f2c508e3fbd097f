use crate::{
    context::AppContext,
    conversation::{messages, Outbox, Payload},
    error::{AppError, AppResult},
    models::{FilmRecord, InlineButton, Keyboard, MessageRef},
};

/// List/delete conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFlow {
    /// Holds the list as it was rendered; delete indices refer to it
    ShowingList { snapshot: Vec<FilmRecord> },
}

impl ListFlow {
    pub async fn start(ctx: &AppContext, user_id: &str, out: &mut Outbox) -> Option<ListFlow> {
        let films = match ctx.store.films(user_id).await {
            Ok(films) => films,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to load film list");
                out.reply(messages::LIST_LOAD_FAILED, Some(Keyboard::command_bar()));
                return None;
            }
        };

        if films.is_empty() {
            out.reply(messages::LIST_EMPTY, Some(Keyboard::command_bar()));
            return None;
        }

        out.reply(
            messages::film_list(messages::LIST_HEADER, &films),
            Some(list_keyboard()),
        );
        Some(ListFlow::ShowingList { snapshot: films })
    }

    pub fn show_delete_interface(
        snapshot: Vec<FilmRecord>,
        message_ref: MessageRef,
        out: &mut Outbox,
    ) -> Option<ListFlow> {
        let mut rows: Vec<Vec<InlineButton>> = snapshot
            .iter()
            .enumerate()
            .map(|(i, film)| {
                vec![InlineButton::callback(
                    messages::delete_label(&film.title),
                    Payload::Delete(i),
                )]
            })
            .collect();
        rows.push(vec![InlineButton::callback(
            messages::CANCEL_BUTTON,
            Payload::CancelDelete,
        )]);

        out.edit(message_ref, messages::CHOOSE_DELETE_TARGET, Some(Keyboard::inline(rows)));
        Some(ListFlow::ShowingList { snapshot })
    }

    pub fn cancel_delete(
        snapshot: Vec<FilmRecord>,
        message_ref: MessageRef,
        out: &mut Outbox,
    ) -> Option<ListFlow> {
        out.edit(
            message_ref,
            messages::film_list(messages::LIST_HEADER, &snapshot),
            Some(list_keyboard()),
        );
        Some(ListFlow::ShowingList { snapshot })
    }

    pub fn show_updated_list(
        snapshot: Vec<FilmRecord>,
        message_ref: MessageRef,
        out: &mut Outbox,
    ) -> Option<ListFlow> {
        out.edit(
            message_ref,
            messages::film_list(messages::UPDATED_LIST_HEADER, &snapshot),
            Some(list_keyboard()),
        );
        Some(ListFlow::ShowingList { snapshot })
    }

    /// Removes the film at `index` of the snapshot and persists the removal
    ///
    /// Stays in the list while films remain; an out-of-range index or a
    /// storage failure ends the conversation without touching the store.
    pub async fn delete(
        ctx: &AppContext,
        user_id: &str,
        mut snapshot: Vec<FilmRecord>,
        index: usize,
        message_ref: MessageRef,
        out: &mut Outbox,
    ) -> Option<ListFlow> {
        let removed = match remove_at(&mut snapshot, index) {
            Ok(film) => film,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Invalid delete target");
                out.edit(message_ref, messages::DELETE_TARGET_MISSING, None);
                return None;
            }
        };

        match ctx.store.remove(user_id, removed.id).await {
            Ok(Some(_)) => {
                tracing::info!(user_id = %user_id, film_id = removed.id, "Film removed");
            }
            Ok(None) => {
                tracing::warn!(
                    user_id = %user_id,
                    film_id = removed.id,
                    "Film was already missing from storage"
                );
            }
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Failed to delete film");
                out.edit(message_ref, messages::DELETE_FAILED, None);
                return None;
            }
        }

        out.edit(message_ref, messages::film_deleted(&removed), None);

        if snapshot.is_empty() {
            out.reply(messages::LIST_NOW_EMPTY, Some(Keyboard::command_bar()));
            return None;
        }

        out.reply(
            messages::OFFER_UPDATED_LIST,
            Some(Keyboard::column(vec![InlineButton::callback(
                messages::SHOW_UPDATED_LIST_BUTTON,
                Payload::ShowUpdatedList,
            )])),
        );
        Some(ListFlow::ShowingList { snapshot })
    }

    pub fn cancel(out: &mut Outbox) {
        out.reply(messages::LIST_CLOSED, Some(Keyboard::command_bar()));
    }
}

fn list_keyboard() -> Keyboard {
    Keyboard::column(vec![InlineButton::callback(
        messages::DELETE_BUTTON,
        Payload::ShowDeleteInterface,
    )])
}

/// Removes one film, keeping the order of the rest
pub fn remove_at(films: &mut Vec<FilmRecord>, index: usize) -> AppResult<FilmRecord> {
    if index >= films.len() {
        return Err(AppError::InvalidSelection(format!(
            "delete index {} of {}",
            index,
            films.len()
        )));
    }
    Ok(films.remove(index))
}
