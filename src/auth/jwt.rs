use std::sync::Arc;

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

/// Claim names checked for the user id, in order.
pub const USER_ID_CLAIMS: [&str; 3] = ["sub", "userId", "id"];

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential supplied")]
    MissingCredential,

    #[error("invalid credential: {0}")]
    InvalidCredential(#[from] jsonwebtoken::errors::Error),

    #[error("credential carries no usable user id")]
    MissingUserId,
}

#[derive(Clone)]
pub struct JwtVerifier {
    inner: Arc<(DecodingKey, Validation)>,
}

impl JwtVerifier {
    /// HS256 verifier over the same secret the token issuer signs with.
    /// `exp` is required and enforced.
    pub fn new(secret: &str) -> Self {
        let key = DecodingKey::from_secret(secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);
        JwtVerifier { inner: Arc::new((key, validation)) }
    }

    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        let (key, validation) = &*self.inner;
        let data = decode::<Map<String, Value>>(token, key, validation)?;
        resolve_user_id(&data.claims).ok_or(AuthError::MissingUserId)
    }

    pub fn authenticate(&self, token: Option<&str>) -> Result<Uuid, AuthError> {
        self.verify(token.ok_or(AuthError::MissingCredential)?)
    }
}

fn resolve_user_id(claims: &Map<String, Value>) -> Option<Uuid> {
    let raw = USER_ID_CLAIMS.iter().find_map(|name| match claims.get(*name)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim()),
        _ => None,
    })?;

    Uuid::parse_str(raw).ok()
}
