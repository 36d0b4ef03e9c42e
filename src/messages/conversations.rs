use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::{auth::AuthUser, extract::{Path, Query}, store::{Conversation, Thread}, AppResult, AppState};

use super::{optional_id, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ThreadQuery {
    #[serde(default, deserialize_with = "optional_id")]
    mission_id: Option<Uuid>,
    page: Option<u32>,
    limit: Option<u32>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn thread(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Path(other_user_id): Path<Uuid>,
    Query(ThreadQuery { mission_id, page, limit }): Query<ThreadQuery>,
) -> AppResult<Json<Thread>> {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);

    let thread = state.store.get_thread(user_id, other_user_id, mission_id, page, limit).await?;
    Ok(Json(thread))
}

#[debug_handler(state = AppState)]
pub(crate) async fn conversations(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> AppResult<Json<Vec<Conversation>>> {
    Ok(Json(state.store.get_conversations(user_id).await?))
}
