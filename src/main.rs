use missionchat::{
    auth::JwtVerifier, config::Config, db, logging,
    notify::{self, NotificationDispatcher},
    presence::PresenceRegistry, store::MessageStore, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_tracing();
    let config = Config::from_env()?;

    let db_pool = db::connect(&config.database_url, config.db_max_connections).await?;
    let notifier = notify::notifier_from_url(config.notifications_url.clone())?;

    let app_state = AppState {
        store: MessageStore::new(db_pool),
        presence: PresenceRegistry::new(),
        verifier: JwtVerifier::new(&config.jwt_secret),
        notifications: NotificationDispatcher::spawn(notifier),
    };

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "missionchat listening");

    axum::serve(listener, missionchat::app(app_state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "could not listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
