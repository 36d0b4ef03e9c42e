#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use jsonwebtoken::{encode, EncodingKey, Header};
use missionchat::{
    auth::JwtVerifier,
    db,
    gateway::{ServerEvent, Session},
    notify::{MessageNotification, NotificationDispatcher, Notifier},
    presence::PresenceRegistry,
    store::MessageStore,
    AppState,
};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceExt;
use uuid::Uuid;

pub const SECRET: &str = "integration-secret";

pub struct Recording(pub mpsc::UnboundedSender<MessageNotification>);

#[async_trait]
impl Notifier for Recording {
    async fn notify(&self, notification: &MessageNotification) -> anyhow::Result<()> {
        let _ = self.0.send(notification.clone());
        Ok(())
    }
}

pub struct Broken;

#[async_trait]
impl Notifier for Broken {
    async fn notify(&self, _: &MessageNotification) -> anyhow::Result<()> {
        anyhow::bail!("notification service is down")
    }
}

pub async fn state_with(notifier: Arc<dyn Notifier>) -> AppState {
    AppState {
        store: MessageStore::new(db::memory().await.unwrap()),
        presence: PresenceRegistry::new(),
        verifier: JwtVerifier::new(SECRET),
        notifications: NotificationDispatcher::spawn(notifier),
    }
}

pub async fn state() -> (AppState, mpsc::UnboundedReceiver<MessageNotification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (state_with(Arc::new(Recording(tx))).await, rx)
}

pub async fn user(state: &AppState, name: &str) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO users (id,name,avatar) VALUES (?,?,NULL)")
        .bind(id.to_string())
        .bind(name)
        .execute(state.store.pool())
        .await
        .unwrap();
    id
}

pub async fn mission(state: &AppState, title: &str) -> Uuid {
    let id = Uuid::now_v7();
    sqlx::query("INSERT INTO missions (id,title) VALUES (?,?)")
        .bind(id.to_string())
        .bind(title)
        .execute(state.store.pool())
        .await
        .unwrap();
    id
}

pub fn token(user_id: Uuid) -> String {
    let exp = time::OffsetDateTime::now_utc().unix_timestamp() + 3600;
    encode(
        &Header::default(),
        &json!({ "sub": user_id.to_string(), "exp": exp }),
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )
    .unwrap()
}

/// Opens a realtime session and swallows its `connected`/`unread_count` greeting.
pub async fn connect(state: &AppState, user_id: Uuid) -> (Session, mpsc::UnboundedReceiver<ServerEvent>) {
    let (session, mut rx) = connect_raw(state, user_id).await;
    assert!(matches!(rx.try_recv(), Ok(ServerEvent::Connected { .. })));
    assert!(matches!(rx.try_recv(), Ok(ServerEvent::UnreadCount { .. })));
    (session, rx)
}

pub async fn connect_raw(state: &AppState, user_id: Uuid) -> (Session, mpsc::UnboundedReceiver<ServerEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Session::open(state.clone(), user_id, tx).await, rx)
}

pub fn drain(rx: &mut mpsc::UnboundedReceiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

pub fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

pub fn post(uri: &str, token: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"));

    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn call(state: &AppState, request: Request<Body>) -> (StatusCode, Value) {
    let response = missionchat::app(state.clone()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}
