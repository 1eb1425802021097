use std::fmt::{Debug, Display};

use argon2::{
    Argon2, PasswordHash, PasswordVerifier,
    password_hash::{PasswordHasher, SaltString},
};
use axum::{extract::FromRequestParts, http::StatusCode, response::IntoResponse};
use deepseq_core::model::researcher::Caller;
use rand::{
    Rng, SeedableRng, TryRngCore,
    distr::Alphanumeric,
    rngs::{OsRng, StdRng},
};
use serde::Serialize;

use super::AppState;
use crate::db::{self, researcher::fetch_caller_by_api_key};

const KEY_PREFIX_LENGTH: usize = 8;
const KEY_LENGTH: usize = 32;
pub const API_KEY_HEADER: &str = "X-API-Key";

#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The part of the key stored in plain text so that a presented key can be matched to
    /// candidate rows before the (slow) hash comparison. `None` for keys too short to have one.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        let Self(key) = self;

        key.get(..KEY_PREFIX_LENGTH)
    }

    /// # Errors
    /// Fails if the operating system can't provide randomness for the salt, or if hashing
    /// itself fails.
    pub fn hash(&self) -> Result<HashedApiKey, KeyHashError> {
        let Self(key) = self;

        let prefix = self.prefix().ok_or(KeyHashError::TooShort)?;

        let mut salt = [0u8; 16];
        OsRng
            .try_fill_bytes(&mut salt)
            .map_err(|err| KeyHashError::Salt(err.to_string()))?;

        let salt =
            SaltString::encode_b64(&salt).map_err(|err| KeyHashError::Salt(err.to_string()))?;

        let hash = Argon2::default()
            .hash_password(key.as_bytes(), &salt)
            .map_err(|err| KeyHashError::Hash(err.to_string()))?
            .to_string();

        Ok(HashedApiKey {
            prefix: prefix.to_string(),
            hash,
        })
    }

    #[must_use]
    pub fn is_same_hash(&self, hash: &str) -> bool {
        let Self(key) = self;

        let Ok(parsed_hash) = PasswordHash::new(hash) else {
            return false;
        };

        Argon2::default()
            .verify_password(key.as_bytes(), &parsed_hash)
            .is_ok()
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        let Self(key) = self;

        key
    }
}

impl From<&str> for ApiKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl Default for ApiKey {
    fn default() -> Self {
        let mut rng = StdRng::from_os_rng();
        let key = (0..KEY_LENGTH)
            .map(|_| rng.sample(Alphanumeric) as char)
            .collect();

        Self(key)
    }
}

// Never print the key itself
impl Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiKey")
            .field(&self.prefix().unwrap_or_default())
            .finish()
    }
}

impl Display for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let Self(key) = self;

        <String as Display>::fmt(key, f)
    }
}

#[derive(Debug, Clone)]
pub struct HashedApiKey {
    pub prefix: String,
    pub hash: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum KeyHashError {
    #[error("API key is too short to hash")]
    TooShort,
    #[error("failed to generate salt: {0}")]
    Salt(String),
    #[error("failed to hash API key: {0}")]
    Hash(String),
}

/// The researcher on whose behalf a request is made, identified by the `X-API-Key` header.
#[derive(Debug, Clone, Copy)]
pub struct User(pub Caller);

impl FromRequestParts<AppState> for User {
    type Rejection = Error;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        app_state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Some(api_key) = parts
            .headers
            .get(API_KEY_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(ApiKey::from)
        else {
            return Err(Error::InvalidApiKey);
        };

        let mut db_conn = app_state.db_conn().await?;

        let caller = fetch_caller_by_api_key(&api_key, &mut db_conn).await?;

        Ok(Self(caller))
    }
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum Error {
    #[error("invalid API key")]
    InvalidApiKey,
    #[error(transparent)]
    Other(db::error::Error),
}

impl From<db::error::Error> for Error {
    fn from(err: db::error::Error) -> Self {
        match err {
            db::error::Error::RecordNotFound => Self::InvalidApiKey,
            _ => Self::Other(err),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            success: bool,
            message: String,
        }

        let status = match &self {
            Self::InvalidApiKey => {
                tracing::debug!(auth_error = %self);
                StatusCode::UNAUTHORIZED
            }
            Self::Other(err) => {
                tracing::error!(auth_error = ?err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let message = match self {
            Self::InvalidApiKey => self.to_string(),
            Self::Other(_) => "internal server error".to_string(),
        };

        (
            status,
            axum::Json(ErrorResponse {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::{ApiKey, KeyHashError};

    #[test]
    fn generated_keys_are_alphanumeric() {
        let key = ApiKey::new();

        assert_eq!(key.as_str().len(), 32);
        assert!(key.as_str().chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(key, ApiKey::new());
    }

    #[test]
    fn hash_verification() {
        let key = ApiKey::new();
        let hashed = key.hash().unwrap();

        assert_eq!(Some(hashed.prefix.as_str()), key.prefix());
        assert!(key.is_same_hash(&hashed.hash));
        assert!(!ApiKey::new().is_same_hash(&hashed.hash));
        assert!(!key.is_same_hash("not a hash"));
    }

    #[test]
    fn short_keys() {
        let key = ApiKey::from("short");

        assert_eq!(key.prefix(), None);
        assert_eq!(key.hash().map(|_| ()), Err(KeyHashError::TooShort));
    }

    #[test]
    fn debug_hides_the_key() {
        let key = ApiKey::new();

        assert!(!format!("{key:?}").contains(key.as_str()));
    }
}
