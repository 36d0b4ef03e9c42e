use axum::{debug_handler, extract::State, Json};
use serde::Serialize;
use uuid::Uuid;

use crate::{auth::AuthUser, extract::{Path, Query}, gateway::ServerEvent, AppError, AppResult, AppState};

use super::MissionQuery;

#[derive(Debug, Serialize)]
pub(crate) struct UnreadCount {
    count: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct MarkReadResult {
    success: bool,
    updated: u64,
}

/// Marks everything `sender_id` sent to `reader_id` as read (optionally within
/// one mission) and tells the sender, if online, so their read ticks flip.
pub async fn mark_read(
    state: &AppState,
    reader_id: Uuid,
    sender_id: Uuid,
    mission_id: Option<Uuid>,
) -> AppResult<u64> {
    if reader_id == sender_id {
        return Err(AppError::BadRequest("cannot mark your own messages as read".to_owned()));
    }

    let updated = state.store.mark_read(reader_id, sender_id, mission_id).await?;
    state
        .presence
        .send_to(sender_id, ServerEvent::MessagesRead { read_by: reader_id, mission_id })
        .await;

    Ok(updated)
}

#[debug_handler(state = AppState)]
pub(crate) async fn unread_count(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<UnreadCount>> {
    let count = state.store.unread_count(user_id).await?;
    Ok(Json(UnreadCount { count }))
}

#[debug_handler(state = AppState)]
pub(crate) async fn mark_read_handler(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(sender_id): Path<Uuid>,
    Query(MissionQuery { mission_id }): Query<MissionQuery>,
) -> AppResult<Json<MarkReadResult>> {
    let updated = mark_read(&state, user_id, sender_id, mission_id).await?;
    Ok(Json(MarkReadResult { success: true, updated }))
}
