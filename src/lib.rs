pub mod appresult;
pub mod auth;
pub mod config;
pub mod db;
pub mod extract;
pub mod gateway;
pub mod logging;
pub mod messages;
pub mod notify;
pub mod presence;
pub mod res;
pub mod store;

use axum::{debug_handler, extract::{FromRef, State}, routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use appresult::{AppError, AppResult};

use auth::JwtVerifier;
use notify::NotificationDispatcher;
use presence::PresenceRegistry;
use store::MessageStore;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub store: MessageStore,
    pub presence: PresenceRegistry,
    pub verifier: JwtVerifier,
    pub notifications: NotificationDispatcher,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/messages", messages::router())
        .merge(gateway::router())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[debug_handler(state = AppState)]
async fn health(State(presence): State<PresenceRegistry>) -> Json<Value> {
    let online = presence.online_count().await;
    Json(json!({ "status": "ok", "online": online }))
}
