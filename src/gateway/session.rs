use tokio::sync::mpsc;
use uuid::Uuid;

use crate::{
    messages::{self, SendMessage},
    presence::ConnectionHandle,
    store::MessageDetails,
    AppResult, AppState,
};

use super::events::{AckRequest, ClientEvent, MarkAsRead, ServerEvent, TypingNotice};

/// One authenticated realtime connection.
///
/// Frames are handled one at a time in arrival order. Handler failures become
/// `error` events and never end the session.
pub struct Session {
    state: AppState,
    user_id: Uuid,
    handle: ConnectionHandle,
}

impl Session {
    /// Registers the connection as the user's current one, then greets it with
    /// `connected` and the user's unread count.
    pub async fn open(state: AppState, user_id: Uuid, outbound: mpsc::UnboundedSender<ServerEvent>) -> Session {
        let handle = ConnectionHandle::new(outbound);
        state.presence.register(user_id, handle.clone()).await;
        tracing::info!(%user_id, connection_id = %handle.id, "realtime connection opened");

        handle.send(ServerEvent::Connected { user_id });
        match state.store.unread_count(user_id).await {
            Ok(count) => {
                handle.send(ServerEvent::UnreadCount { count });
            }
            Err(err) => {
                tracing::warn!(%user_id, error = %err, "could not load unread count");
                handle.send(ServerEvent::Error { message: err.public_message() });
            }
        }

        Session { state, user_id, handle }
    }

    /// Parses and handles one raw client frame.
    pub async fn handle_frame(&self, raw: &[u8]) {
        let event = match serde_json::from_slice::<ClientEvent>(raw) {
            Ok(event) => event,
            Err(err) => {
                tracing::debug!(user_id = %self.user_id, error = %err, "unreadable frame");
                self.emit(ServerEvent::Error { message: format!("invalid event: {err}") });
                return;
            }
        };
        let AckRequest { ack } = serde_json::from_slice(raw).unwrap_or_default();

        self.handle(event, ack).await;
    }

    pub async fn handle(&self, event: ClientEvent, ack: Option<u64>) {
        let outcome = match event {
            ClientEvent::SendMessage(input) => self.send_message(input).await.map(Some),
            ClientEvent::MarkAsRead(input) => self.mark_as_read(input).await.map(|_| None),
            ClientEvent::Typing(notice) => {
                self.relay_typing(notice, true).await;
                return;
            }
            ClientEvent::StopTyping(notice) => {
                self.relay_typing(notice, false).await;
                return;
            }
        };

        match outcome {
            Ok(message) => {
                if let Some(id) = ack {
                    self.emit(ServerEvent::Ack { id, success: true, message, error: None });
                }
            }
            Err(err) => {
                tracing::warn!(user_id = %self.user_id, error = %err, "realtime event failed");
                self.emit(ServerEvent::Error { message: err.public_message() });
                if let Some(id) = ack {
                    self.emit(ServerEvent::Ack { id, success: false, message: None, error: Some(err.public_message()) });
                }
            }
        }
    }

    async fn send_message(&self, input: SendMessage) -> AppResult<MessageDetails> {
        let details = messages::send(&self.state, self.user_id, input).await?;
        self.emit(ServerEvent::MessageSent(details.clone()));
        Ok(details)
    }

    async fn mark_as_read(&self, MarkAsRead { sender_id, mission_id }: MarkAsRead) -> AppResult<u64> {
        messages::mark_read(&self.state, self.user_id, sender_id, mission_id).await
    }

    async fn relay_typing(&self, TypingNotice { receiver_id, mission_id }: TypingNotice, typing: bool) {
        let event = if typing {
            ServerEvent::UserTyping { user_id: self.user_id, mission_id }
        } else {
            ServerEvent::UserStopTyping { user_id: self.user_id, mission_id }
        };
        self.state.presence.send_to(receiver_id, event).await;
    }

    fn emit(&self, event: ServerEvent) {
        if !self.handle.send(event) {
            tracing::debug!(user_id = %self.user_id, "connection writer already closed");
        }
    }

    /// Drops the presence entry unless a newer connection already replaced it.
    pub async fn close(self) {
        let removed = self.state.presence.unregister(self.user_id, self.handle.id).await;
        tracing::info!(
            user_id = %self.user_id,
            connection_id = %self.handle.id,
            superseded = !removed,
            "realtime connection closed"
        );
    }
}
