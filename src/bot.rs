//! Event router.
//!
//! Owns the per-user conversation slots and dispatches every inbound event to
//! the handler of the user's live conversation. Events of one user are
//! handled one at a time; different users proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::{
    context::AppContext,
    conversation::{
        messages, AddFlow, Conversation, ListFlow, Outbox, Payload, RecommendFlow,
    },
    error::AppError,
    models::{InboundEvent, Keyboard, MessageRef, OutboundMessage, UserId},
};

type SessionSlot = Arc<Mutex<Option<Conversation>>>;

pub struct Bot {
    ctx: AppContext,
    sessions: Mutex<HashMap<UserId, SessionSlot>>,
}

impl Bot {
    pub fn new(ctx: AppContext) -> Self {
        Self {
            ctx,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Handles one inbound event and returns the messages to deliver
    pub async fn handle(&self, event: InboundEvent) -> Vec<OutboundMessage> {
        let user_id = event.user_id().to_string();
        let slot = self.session_slot(&user_id).await;
        let mut session = slot.lock().await;
        let mut out = Outbox::new(&user_id);

        let current = session.take();
        let next = match event {
            InboundEvent::Command { name, .. } => {
                tracing::info!(user_id = %user_id, command = %name, "Command received");
                self.on_command(&name, &user_id, current, &mut out).await
            }
            InboundEvent::Text { text, .. } => {
                tracing::debug!(user_id = %user_id, "Text received");
                self.on_text(&user_id, &text, current, &mut out).await
            }
            InboundEvent::ButtonTap {
                payload,
                message_ref,
                ..
            } => {
                tracing::info!(user_id = %user_id, payload = %payload, "Button tapped");
                self.on_button(&user_id, &payload, message_ref, current, &mut out)
                    .await
            }
        };

        if let Some(conversation) = &next {
            tracing::debug!(user_id = %user_id, conversation = conversation.kind(), "Conversation continues");
        }
        let ended = next.is_none();
        *session = next;
        drop(session);

        if ended {
            self.release_slot(&user_id, &slot).await;
        }

        out.into_messages()
    }

    pub fn context(&self) -> &AppContext {
        &self.ctx
    }

    /// Live conversation of a user, if any
    pub async fn conversation(&self, user_id: &str) -> Option<Conversation> {
        let slot = self.sessions.lock().await.get(user_id).cloned()?;
        let session = slot.lock().await;
        session.clone()
    }

    async fn session_slot(&self, user_id: &str) -> SessionSlot {
        let mut sessions = self.sessions.lock().await;
        sessions.entry(user_id.to_string()).or_default().clone()
    }

    /// Drops an idle slot so the map only holds users with a live conversation
    ///
    /// The slot stays while any other event of the same user holds a clone;
    /// that event releases it once it finishes.
    async fn release_slot(&self, user_id: &str, slot: &SessionSlot) {
        let mut sessions = self.sessions.lock().await;
        let idle = sessions
            .get(user_id)
            .is_some_and(|held| Arc::ptr_eq(held, slot) && Arc::strong_count(slot) == 2);
        if idle {
            sessions.remove(user_id);
        }
    }

    async fn on_command(
        &self,
        name: &str,
        user_id: &str,
        current: Option<Conversation>,
        out: &mut Outbox,
    ) -> Option<Conversation> {
        let starts_conversation = matches!(name, "add" | "list" | "recommend");
        if let (true, Some(previous)) = (starts_conversation, &current) {
            tracing::info!(user_id = %user_id, previous = previous.kind(), "Conversation superseded");
        }

        match name {
            "start" => {
                out.reply(messages::welcome(), Some(Keyboard::command_bar()));
                current
            }
            "help" => {
                out.reply(
                    messages::help(self.ctx.support_contact()),
                    Some(Keyboard::command_bar()),
                );
                current
            }
            "add" => Some(Conversation::Add(AddFlow::start(out))),
            "list" => ListFlow::start(&self.ctx, user_id, out)
                .await
                .map(Conversation::List),
            "recommend" => Some(Conversation::Recommend(RecommendFlow::start(out))),
            "cancel" => {
                match current {
                    Some(Conversation::Add(_)) => AddFlow::cancel(out),
                    Some(Conversation::List(_)) => ListFlow::cancel(out),
                    Some(Conversation::Recommend(_)) => RecommendFlow::cancel(out),
                    None => out.reply(messages::NOTHING_TO_CANCEL, Some(Keyboard::command_bar())),
                }
                None
            }
            _ => {
                out.reply(messages::UNKNOWN_COMMAND, Some(Keyboard::command_bar()));
                current
            }
        }
    }

    async fn on_text(
        &self,
        user_id: &str,
        text: &str,
        current: Option<Conversation>,
        out: &mut Outbox,
    ) -> Option<Conversation> {
        match current {
            // A new title while the pick-list is open starts a fresh search
            Some(Conversation::Add(_)) => AddFlow::on_title(&self.ctx, user_id, text, out)
                .await
                .map(Conversation::Add),
            other => {
                out.reply(messages::text_hint(), Some(Keyboard::command_bar()));
                other
            }
        }
    }

    async fn on_button(
        &self,
        user_id: &str,
        raw_payload: &str,
        message_ref: MessageRef,
        current: Option<Conversation>,
        out: &mut Outbox,
    ) -> Option<Conversation> {
        let payload = match raw_payload.parse::<Payload>() {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(user_id = %user_id, error = %e, "Unparsable button payload");
                out.edit(message_ref, messages::SESSION_EXPIRED, None);
                return None;
            }
        };

        let ctx = &self.ctx;
        match (payload, current) {
            (Payload::ShowDeleteInterface, Some(Conversation::List(ListFlow::ShowingList { snapshot }))) => {
                ListFlow::show_delete_interface(snapshot, message_ref, out).map(Conversation::List)
            }
            (Payload::CancelDelete, Some(Conversation::List(ListFlow::ShowingList { snapshot }))) => {
                ListFlow::cancel_delete(snapshot, message_ref, out).map(Conversation::List)
            }
            (Payload::ShowUpdatedList, Some(Conversation::List(ListFlow::ShowingList { snapshot }))) => {
                ListFlow::show_updated_list(snapshot, message_ref, out).map(Conversation::List)
            }
            (Payload::Delete(index), Some(Conversation::List(ListFlow::ShowingList { snapshot }))) => {
                ListFlow::delete(ctx, user_id, snapshot, index, message_ref, out)
                    .await
                    .map(Conversation::List)
            }

            (Payload::Mode(mode), _) => {
                RecommendFlow::choose_mode(ctx, user_id, mode, message_ref, out)
                    .await
                    .map(Conversation::Recommend)
            }
            (Payload::CloseRecommendations, current) => {
                RecommendFlow::close(message_ref, out);
                keep_unless_recommend(current)
            }
            (Payload::OpenRecommendation(film_id), current) => {
                RecommendFlow::open_film(ctx, film_id, out);
                keep_unless_recommend(current)
            }

            (Payload::FilmPage(page), Some(Conversation::Recommend(RecommendFlow::FilmBrowsing { film, .. }))) => {
                RecommendFlow::browse_film(ctx, user_id, film, page, message_ref, out)
                    .await
                    .map(Conversation::Recommend)
            }
            (Payload::MoreFilm, Some(Conversation::Recommend(RecommendFlow::FilmBrowsing { film, page }))) => {
                RecommendFlow::browse_film(ctx, user_id, film, page.saturating_add(1), message_ref, out)
                    .await
                    .map(Conversation::Recommend)
            }
            (Payload::Pick(index), Some(Conversation::Recommend(RecommendFlow::FilmPick { films }))) => {
                RecommendFlow::pick_film(ctx, user_id, films, index, message_ref, out)
                    .await
                    .map(Conversation::Recommend)
            }

            (
                Payload::GenrePage(page),
                Some(Conversation::Recommend(RecommendFlow::GenreBrowsing { genre_id, genre_name, .. })),
            ) => RecommendFlow::browse_genre(ctx, user_id, genre_id, genre_name, page, message_ref, out)
                .await
                .map(Conversation::Recommend),
            (
                Payload::MoreGenre,
                Some(Conversation::Recommend(RecommendFlow::GenreBrowsing { genre_id, genre_name, page })),
            ) => RecommendFlow::browse_genre(
                ctx,
                user_id,
                genre_id,
                genre_name,
                page.saturating_add(1),
                message_ref,
                out,
            )
            .await
            .map(Conversation::Recommend),
            (Payload::Pick(genre_id), Some(Conversation::Recommend(RecommendFlow::GenrePick { genres }))) => {
                RecommendFlow::pick_genre(ctx, user_id, genres, genre_id, message_ref, out)
                    .await
                    .map(Conversation::Recommend)
            }

            (Payload::Pick(index), Some(Conversation::Add(AddFlow::AwaitingDisambiguation { candidates }))) => {
                AddFlow::on_pick(ctx, user_id, candidates, index, message_ref, out)
                    .await
                    .map(Conversation::Add)
            }

            (payload, current) => {
                tracing::warn!(
                    user_id = %user_id,
                    payload = %payload,
                    conversation = current.as_ref().map(Conversation::kind).unwrap_or("none"),
                    error = %AppError::ExpiredSession,
                    "No conversation accepts this button"
                );
                out.edit(message_ref, messages::SESSION_EXPIRED, None);
                None
            }
        }
    }
}

/// Ends a recommend conversation, leaves any other one running
fn keep_unless_recommend(current: Option<Conversation>) -> Option<Conversation> {
    match current {
        Some(Conversation::Recommend(_)) => None,
        other => other,
    }
}
