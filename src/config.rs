use std::str::FromStr;

use crate::{AppError, AppResult};

const DEFAULT_DATABASE_URL: &str = "sqlite://missionchat.db?mode=rwc";
const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 16;

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub jwt_secret: String,
    pub bind_addr: String,
    /// Where message notifications are POSTed. Unset means log-only.
    pub notifications_url: Option<String>,
}

impl Config {
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let jwt_secret = var("JWT_SECRET")
            .ok_or_else(|| AppError::Config("JWT_SECRET must be set".to_owned()))?;

        Ok(Config {
            database_url: var("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_owned()),
            db_max_connections: parsed("DB_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS)?,
            jwt_secret,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned()),
            notifications_url: var("NOTIFICATIONS_URL"),
        })
    }
}

fn var(key: &str) -> Option<String> {
    dotenv::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(key: &str, default: T) -> AppResult<T> {
    match var(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} has an invalid value: {raw}"))),
        None => Ok(default),
    }
}
