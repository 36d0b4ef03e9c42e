//! Best-effort message notifications.
//!
//! Senders hand a [`MessageNotification`] to the [`NotificationDispatcher`] and
//! move on. A background worker forwards it to the configured [`Notifier`];
//! failures end up in the logs and nowhere else.

mod http;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

pub use http::HttpNotifier;

use crate::store::MessageDetails;

const FALLBACK_SENDER_NAME: &str = "Someone";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageNotification {
    pub receiver_id: Uuid,
    pub sender_id: Uuid,
    pub sender_name: String,
    pub mission_id: Option<Uuid>,
    pub mission_title: Option<String>,
    pub message_id: Uuid,
}

impl MessageNotification {
    pub fn for_message(details: &MessageDetails) -> Self {
        MessageNotification {
            receiver_id: details.message.receiver_id,
            sender_id: details.message.sender_id,
            sender_name: details
                .sender
                .name
                .clone()
                .unwrap_or_else(|| FALLBACK_SENDER_NAME.to_owned()),
            mission_id: details.message.mission_id,
            mission_title: details.mission.as_ref().and_then(|mission| mission.title.clone()),
            message_id: details.message.id,
        }
    }
}

/// Whatever turns a message notification into an in-app or push notification.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &MessageNotification) -> anyhow::Result<()>;
}

/// Used when no notification service is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &MessageNotification) -> anyhow::Result<()> {
        tracing::info!(
            receiver_id = %notification.receiver_id,
            sender_id = %notification.sender_id,
            mission_id = ?notification.mission_id,
            "message notification (no notification service configured)"
        );
        Ok(())
    }
}

pub fn notifier_from_url(url: Option<String>) -> anyhow::Result<Arc<dyn Notifier>> {
    Ok(match url {
        Some(url) => Arc::new(HttpNotifier::new(url)?),
        None => Arc::new(LogNotifier),
    })
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    tx: mpsc::UnboundedSender<MessageNotification>,
}

impl NotificationDispatcher {
    /// Starts the worker on the current runtime.
    pub fn spawn(notifier: Arc<dyn Notifier>) -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<MessageNotification>();

        tokio::spawn(async move {
            while let Some(notification) = rx.recv().await {
                if let Err(err) = notifier.notify(&notification).await {
                    tracing::warn!(
                        receiver_id = %notification.receiver_id,
                        message_id = %notification.message_id,
                        error = %err,
                        "message notification failed"
                    );
                }
            }
        });

        NotificationDispatcher { tx }
    }

    /// Never blocks and never fails the caller.
    pub fn dispatch(&self, notification: MessageNotification) {
        if self.tx.send(notification).is_err() {
            tracing::warn!("notification worker is gone, dropping notification");
        }
    }
}
