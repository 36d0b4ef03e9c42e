//! Messaging operations shared by the realtime gateway and the REST fallback,
//! plus the REST routes themselves.

mod conversations;
mod read;
mod send;

use axum::{routing::{get, post}, Router};
use serde::{de, Deserialize, Deserializer};
use uuid::Uuid;

pub use read::mark_read;
pub use send::{send, SendMessage};

use crate::AppState;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const MAX_PAGE_SIZE: u32 = 100;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(send::send_message))
        .route("/conversation/{other_user_id}", get(conversations::thread))
        .route("/conversations", get(conversations::conversations))
        .route("/unread-count", get(read::unread_count))
        .route("/mark-read/{sender_id}", post(read::mark_read_handler))
}

/// Query-string mission filter. Mobile clients send `missionId=` or
/// `missionId=null` for "no mission".
fn optional_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Uuid>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") | Some("null") | Some("undefined") => Ok(None),
        Some(raw) => Uuid::parse_str(raw).map(Some).map_err(de::Error::custom),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MissionQuery {
    #[serde(default, deserialize_with = "optional_id")]
    pub mission_id: Option<Uuid>,
}
