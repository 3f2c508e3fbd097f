use crate::{
    context::AppContext,
    conversation::{messages, Outbox, Payload},
    error::AppError,
    models::{Candidate, FilmRecord, InlineButton, Keyboard, MessageRef},
    store::AddOutcome,
};

/// Most search results offered in the pick-list
pub const MAX_SEARCH_CHOICES: usize = 5;

/// Add-film conversation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddFlow {
    AwaitingTitle,
    /// Pick-list shown; holds exactly the candidates offered
    AwaitingDisambiguation { candidates: Vec<Candidate> },
}

impl AddFlow {
    pub fn start(out: &mut Outbox) -> Self {
        out.reply(messages::ASK_TITLE, Some(Keyboard::command_bar()));
        AddFlow::AwaitingTitle
    }

    /// Searches the typed title
    ///
    /// No match or a failed search keeps waiting for a title, a single match
    /// is saved right away, several matches produce a pick-list.
    pub async fn on_title(
        ctx: &AppContext,
        user_id: &str,
        title: &str,
        out: &mut Outbox,
    ) -> Option<AddFlow> {
        let title = title.trim();
        if title.is_empty() {
            out.reply(messages::ASK_TITLE, Some(Keyboard::command_bar()));
            return Some(AddFlow::AwaitingTitle);
        }

        tracing::info!(user_id = %user_id, title = %title, "Searching for film");

        let mut results = match ctx.metadata.search(title).await {
            Ok(results) => results,
            Err(e) => {
                tracing::error!(user_id = %user_id, error = %e, "Film search failed");
                out.reply(messages::SEARCH_FAILED, Some(Keyboard::command_bar()));
                return Some(AddFlow::AwaitingTitle);
            }
        };

        match results.len() {
            0 => {
                out.reply(messages::FILM_NOT_FOUND, Some(Keyboard::command_bar()));
                Some(AddFlow::AwaitingTitle)
            }
            1 => {
                let candidate = results.remove(0);
                tracing::info!(film_id = candidate.id, "Single result found, adding");
                save_candidate(ctx, user_id, &candidate, out).await;
                None
            }
            _ => {
                results.truncate(MAX_SEARCH_CHOICES);
                let buttons = results
                    .iter()
                    .enumerate()
                    .map(|(i, c)| InlineButton::callback(c.label(), Payload::Pick(i as u64)))
                    .collect();
                out.reply(messages::CHOOSE_SEARCH_RESULT, Some(Keyboard::column(buttons)));
                Some(AddFlow::AwaitingDisambiguation {
                    candidates: results,
                })
            }
        }
    }

    /// Saves the candidate at `index` of the offered pick-list; always terminal
    pub async fn on_pick(
        ctx: &AppContext,
        user_id: &str,
        candidates: Vec<Candidate>,
        index: u64,
        message_ref: MessageRef,
        out: &mut Outbox,
    ) -> Option<AddFlow> {
        let chosen = usize::try_from(index)
            .ok()
            .and_then(|i| candidates.get(i));

        match chosen {
            Some(candidate) => save_candidate(ctx, user_id, candidate, out).await,
            None => {
                let error = AppError::InvalidSelection(format!(
                    "search result {} of {}",
                    index,
                    candidates.len()
                ));
                tracing::warn!(user_id = %user_id, error = %error, "Invalid search pick");
                out.edit(message_ref, messages::ADD_PICK_INVALID, None);
            }
        }

        None
    }

    pub fn cancel(out: &mut Outbox) {
        out.reply(messages::ADD_CANCELLED, Some(Keyboard::command_bar()));
    }
}

/// Persists a candidate unless the user already saved a film with its id
async fn save_candidate(ctx: &AppContext, user_id: &str, candidate: &Candidate, out: &mut Outbox) {
    match ctx.store.films(user_id).await {
        Ok(films) if films.iter().any(|f| f.id == candidate.id) => {
            out.reply(messages::ALREADY_SAVED, Some(Keyboard::command_bar()));
            return;
        }
        Ok(_) => {}
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to load films before saving");
            out.reply(messages::SAVE_FAILED, Some(Keyboard::command_bar()));
            return;
        }
    }

    let taxonomy = ctx.metadata.genres().await;
    let record = FilmRecord::from_candidate(candidate, &taxonomy);

    match ctx.store.add(user_id, record.clone()).await {
        Ok(AddOutcome::Added) => {
            out.reply(messages::film_added(&record), Some(Keyboard::command_bar()));
        }
        Ok(AddOutcome::Duplicate) => {
            out.reply(messages::ALREADY_SAVED, Some(Keyboard::command_bar()));
        }
        Err(e) => {
            tracing::error!(user_id = %user_id, error = %e, "Failed to save film");
            out.reply(messages::SAVE_FAILED, Some(Keyboard::command_bar()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::test_support::{candidate, context_with, film};
    use crate::models::{FilmCatalog, GenreTaxonomy};
    use crate::services::metadata::MockMetadataProvider;

    fn sci_fi() -> GenreTaxonomy {
        GenreTaxonomy::from([(878, "Science Fiction".to_string()), (12, "Adventure".to_string())])
    }

    fn dune_candidates() -> Vec<Candidate> {
        vec![
            candidate(438631, "Dune", vec![878, 12]),
            candidate(841, "Dune", vec![878]),
        ]
    }

    #[tokio::test]
    async fn test_start_prompts_for_title() {
        let mut out = Outbox::new("1");
        assert_eq!(AddFlow::start(&mut out), AddFlow::AwaitingTitle);
        assert_eq!(out.messages()[0].text, messages::ASK_TITLE);
    }

    #[tokio::test]
    async fn test_several_results_offer_pick_list() {
        let mut metadata = MockMetadataProvider::new();
        metadata
            .expect_search()
            .withf(|title| title == "Dune")
            .times(1)
            .returning(|_| Ok(dune_candidates()));
        let (ctx, _handle, _) = context_with(metadata, FilmCatalog::new());
        let mut out = Outbox::new("1");

        let next = AddFlow::on_title(&ctx, "1", "  Dune ", &mut out).await;

        assert_eq!(
            next,
            Some(AddFlow::AwaitingDisambiguation {
                candidates: dune_candidates()
            })
        );
        let keyboard = out.messages()[0].keyboard.as_ref().unwrap();
        let payloads: Vec<_> = keyboard.buttons().iter().filter_map(|b| b.payload()).collect();
        assert_eq!(payloads, vec!["0", "1"]);
        assert_eq!(keyboard.buttons()[0].label, "Dune (2000)");
    }

    #[tokio::test]
    async fn test_pick_list_is_capped() {
        let mut metadata = MockMetadataProvider::new();
        metadata.expect_search().returning(|_| {
            Ok((0..9).map(|i| candidate(i, "Same", vec![])).collect())
        });
        let (ctx, _handle, _) = context_with(metadata, FilmCatalog::new());
        let mut out = Outbox::new("1");

        let next = AddFlow::on_title(&ctx, "1", "Same", &mut out).await;

        match next {
            Some(AddFlow::AwaitingDisambiguation { candidates }) => {
                assert_eq!(candidates.len(), MAX_SEARCH_CHOICES)
            }
            other => panic!("unexpected state {:?}", other),
        }
        assert_eq!(
            out.messages()[0].keyboard.as_ref().unwrap().buttons().len(),
            MAX_SEARCH_CHOICES
        );
    }

    #[tokio::test]
    async fn test_no_match_keeps_waiting() {
        let mut metadata = MockMetadataProvider::new();
        metadata.expect_search().returning(|_| Ok(vec![]));
        let (ctx, _handle, _) = context_with(metadata, FilmCatalog::new());
        let mut out = Outbox::new("1");

        let next = AddFlow::on_title(&ctx, "1", "qwertyuiop", &mut out).await;

        assert_eq!(next, Some(AddFlow::AwaitingTitle));
        assert_eq!(out.messages()[0].text, messages::FILM_NOT_FOUND);
    }

    #[tokio::test]
    async fn test_search_failure_keeps_waiting_with_distinct_message() {
        let mut metadata = MockMetadataProvider::new();
        metadata
            .expect_search()
            .returning(|_| Err(AppError::MetadataUnavailable("timeout".to_string())));
        let (ctx, _handle, backend) = context_with(metadata, FilmCatalog::new());
        let mut out = Outbox::new("1");

        let next = AddFlow::on_title(&ctx, "1", "Dune", &mut out).await;

        assert_eq!(next, Some(AddFlow::AwaitingTitle));
        assert_eq!(out.messages()[0].text, messages::SEARCH_FAILED);
        assert_eq!(backend.save_count(), 0);
    }

    #[tokio::test]
    async fn test_single_result_is_saved_immediately() {
        let mut metadata = MockMetadataProvider::new();
        metadata
            .expect_search()
            .returning(|_| Ok(vec![candidate(603, "The Matrix", vec![878])]));
        metadata.expect_genres().times(1).returning(sci_fi);
        let (ctx, _handle, _) = context_with(metadata, FilmCatalog::new());
        let mut out = Outbox::new("1");

        let next = AddFlow::on_title(&ctx, "1", "The Matrix", &mut out).await;

        assert_eq!(next, None);
        assert_eq!(
            out.messages()[0].text,
            "Film \"The Matrix\" (Science Fiction) added!"
        );
        let saved = ctx.store.films("1").await.unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].genres, vec!["Science Fiction"]);
    }

    #[tokio::test]
    async fn test_pick_saves_chosen_candidate() {
        let mut metadata = MockMetadataProvider::new();
        metadata.expect_genres().returning(sci_fi);
        let (ctx, _handle, _) = context_with(metadata, FilmCatalog::new());
        let mut out = Outbox::new("1");

        let next = AddFlow::on_pick(&ctx, "1", dune_candidates(), 0, 5, &mut out).await;

        assert_eq!(next, None);
        assert!(out.messages()[0].text.contains("Dune"));
        let saved = ctx.store.films("1").await.unwrap();
        assert_eq!(
            saved,
            vec![FilmRecord {
                id: 438631,
                title: "Dune".to_string(),
                genres: vec!["Science Fiction".to_string(), "Adventure".to_string()],
            }]
        );
    }

    #[tokio::test]
    async fn test_duplicate_pick_does_not_write() {
        let metadata = MockMetadataProvider::new();
        let catalog = FilmCatalog::from([("1".to_string(), vec![film(438631, "Dune")])]);
        let (ctx, _handle, backend) = context_with(metadata, catalog);
        let mut out = Outbox::new("1");

        let next = AddFlow::on_pick(&ctx, "1", dune_candidates(), 0, 5, &mut out).await;

        assert_eq!(next, None);
        assert_eq!(out.messages()[0].text, messages::ALREADY_SAVED);
        assert_eq!(backend.save_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_pick_ends_conversation() {
        let metadata = MockMetadataProvider::new();
        let (ctx, _handle, backend) = context_with(metadata, FilmCatalog::new());
        let mut out = Outbox::new("1");

        let next = AddFlow::on_pick(&ctx, "1", dune_candidates(), 7, 5, &mut out).await;

        assert_eq!(next, None);
        assert_eq!(out.messages()[0].text, messages::ADD_PICK_INVALID);
        assert_eq!(out.messages()[0].target, crate::models::MessageTarget::Edit(5));
        assert_eq!(backend.save_count(), 0);
    }

    #[tokio::test]
    async fn test_genre_outage_saves_without_genres() {
        let mut metadata = MockMetadataProvider::new();
        metadata.expect_genres().returning(GenreTaxonomy::new);
        let (ctx, _handle, _) = context_with(metadata, FilmCatalog::new());
        let mut out = Outbox::new("1");

        AddFlow::on_pick(&ctx, "1", dune_candidates(), 1, 5, &mut out).await;

        assert_eq!(out.messages()[0].text, "Film \"Dune\" added!");
        assert!(ctx.store.films("1").await.unwrap()[0].genres.is_empty());
    }
}
