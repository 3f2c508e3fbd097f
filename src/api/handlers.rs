use axum::{extract::State, http::StatusCode, Extension, Json};
use serde_json::{json, Value};

use crate::{
    error::{AppError, AppResult},
    middleware::RequestId,
    models::{InboundEvent, OutboundMessage},
};

use super::AppState;

/// Health check endpoint; also proves the film store is readable
pub async fn health_check(State(state): State<AppState>) -> AppResult<(StatusCode, Json<Value>)> {
    let catalog = state.bot.context().store.catalog().await?;
    Ok((
        StatusCode::OK,
        Json(json!({ "status": "healthy", "users": catalog.len() })),
    ))
}

/// Feeds one transport event to the bot and returns the messages to deliver
pub async fn receive_event(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(event): Json<InboundEvent>,
) -> AppResult<Json<Vec<OutboundMessage>>> {
    if event.user_id().trim().is_empty() {
        return Err(AppError::InvalidSelection(
            "user_id must not be empty".to_string(),
        ));
    }

    let messages = state.bot.handle(event).await;
    tracing::debug!(request_id = %request_id, count = messages.len(), "Event handled");

    Ok(Json(messages))
}
