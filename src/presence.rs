use std::{collections::HashMap, sync::Arc};

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use crate::gateway::ServerEvent;

/// Identifies one realtime connection for its whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Outbound half of a live connection.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    pub id: ConnectionId,
    sender: mpsc::UnboundedSender<ServerEvent>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::UnboundedSender<ServerEvent>) -> Self {
        ConnectionHandle { id: ConnectionId::new(), sender }
    }

    /// False once the connection's writer has gone away.
    pub fn send(&self, event: ServerEvent) -> bool {
        self.sender.send(event).is_ok()
    }
}

/// Which connection currently speaks for each online user.
///
/// A cache rebuilt from reconnects, never a source of truth. Only the gateway's
/// connect and disconnect paths mutate it; everything else reads.
#[derive(Debug, Default, Clone)]
pub struct PresenceRegistry {
    inner: Arc<RwLock<HashMap<Uuid, ConnectionHandle>>>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `handle` the user's connection. Returns the one it superseded;
    /// the superseded connection is left open.
    pub(crate) async fn register(&self, user_id: Uuid, handle: ConnectionHandle) -> Option<ConnectionHandle> {
        let previous = self.inner.write().await.insert(user_id, handle);

        if let Some(previous) = &previous {
            tracing::debug!(%user_id, superseded = %previous.id, "presence entry replaced");
        }
        previous
    }

    /// Drops the user's entry if it still belongs to `connection`. A
    /// connection that was superseded leaves its successor in place.
    pub(crate) async fn unregister(&self, user_id: Uuid, connection: ConnectionId) -> bool {
        let mut guard = self.inner.write().await;
        match guard.get(&user_id) {
            Some(current) if current.id == connection => {
                guard.remove(&user_id);
                true
            }
            _ => false,
        }
    }

    pub async fn get(&self, user_id: Uuid) -> Option<ConnectionHandle> {
        self.inner.read().await.get(&user_id).cloned()
    }

    pub async fn is_online(&self, user_id: Uuid) -> bool {
        self.inner.read().await.contains_key(&user_id)
    }

    /// Delivers to the user's current connection, if any.
    pub async fn send_to(&self, user_id: Uuid, event: ServerEvent) -> bool {
        match self.get(user_id).await {
            Some(handle) => handle.send(event),
            None => false,
        }
    }

    pub async fn online_count(&self) -> usize {
        self.inner.read().await.len()
    }
}
