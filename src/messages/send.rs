use axum::{debug_handler, extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    extract,
    gateway::ServerEvent,
    notify::MessageNotification,
    store::MessageDetails,
    AppError, AppResult, AppState,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessage {
    pub receiver_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub mission_id: Option<Uuid>,
}

/// Persists a message from `sender_id`, pushes `new_message` to the receiver
/// when they are online and queues the push notification.
///
/// The notification is fire-and-forget: its failure never reaches the caller.
pub async fn send(
    state: &AppState,
    sender_id: Uuid,
    SendMessage { receiver_id, content, mission_id }: SendMessage,
) -> AppResult<MessageDetails> {
    if content.trim().is_empty() {
        return Err(AppError::BadRequest("content must not be empty".to_owned()));
    }
    if receiver_id == sender_id {
        return Err(AppError::BadRequest("cannot send a message to yourself".to_owned()));
    }

    let details = state.store.append(sender_id, receiver_id, &content, mission_id).await?;

    let delivered = state.presence.send_to(receiver_id, ServerEvent::NewMessage(details.clone())).await;
    tracing::debug!(
        message_id = %details.message.id,
        %sender_id,
        %receiver_id,
        delivered,
        "message stored"
    );

    state.notifications.dispatch(MessageNotification::for_message(&details));

    Ok(details)
}

#[debug_handler(state = AppState)]
pub(crate) async fn send_message(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    extract::Json(input): extract::Json<SendMessage>,
) -> AppResult<(StatusCode, Json<MessageDetails>)> {
    let details = send(&state, user_id, input).await?;
    Ok((StatusCode::CREATED, Json(details)))
}
