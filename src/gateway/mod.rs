mod events;
mod session;

use axum::{
    debug_handler,
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

pub use events::{ClientEvent, MarkAsRead, ServerEvent, TypingNotice};
pub use session::Session;

use crate::{auth::bearer_token, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/ws", get(realtime_ws))
}

#[derive(Debug, Deserialize)]
pub(crate) struct HandshakeQuery {
    token: Option<String>,
}

/// Upgrades to the realtime channel. The credential is checked before the
/// upgrade, so a rejected client never sees a single event.
#[debug_handler(state = AppState)]
pub(crate) async fn realtime_ws(
    State(state): State<AppState>,
    Query(HandshakeQuery { token }): Query<HandshakeQuery>,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let token = token
        .as_deref()
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .or_else(|| bearer_token(&headers));

    let user_id = match state.verifier.authenticate(token) {
        Ok(user_id) => user_id,
        Err(err) => {
            tracing::warn!(error = %err, "realtime handshake rejected");
            return StatusCode::UNAUTHORIZED.into_response();
        }
    };

    match ws {
        Ok(ws) => ws.on_upgrade(move |stream| serve(state, user_id, stream)),
        Err(rejection) => rejection.into_response(),
    }
}

async fn serve(state: AppState, user_id: Uuid, stream: WebSocket) {
    let (mut sender, mut receiver) = stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    let mut write_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(err) => {
                    tracing::error!(error = %err, "could not encode server event");
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    let session = Session::open(state, user_id, tx).await;

    loop {
        tokio::select! {
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Text(text))) => session.handle_frame(text.as_str().as_bytes()).await,
                Some(Ok(Message::Binary(data))) => session.handle_frame(&data).await,
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = &mut write_task => break,
        }
    }

    session.close().await;
    write_task.abort();
}
