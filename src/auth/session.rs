//! Signed, expiring session tokens keyed by the installation secret.
//!
//! Tokens are HS256 JWTs whose HMAC key is exactly the bootstrap secret, so a
//! token minted by another installation (or before the secret was replaced)
//! never validates here.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::auth::secret::SessionSecret;
use crate::error::TrainerError;

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

/// The authenticated principal attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: i64,
    pub username: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    /// User id, decimal.
    sub: String,
    name: String,
    iat: i64,
    exp: i64,
}

/// Validates a presented session token.
pub trait SessionAuthenticator: Send + Sync {
    /// Any signature, shape or expiry failure is `TrainerError::Unauthenticated`.
    fn authenticate(&self, token: &str) -> Result<UserIdentity, TrainerError>;
}

pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl SessionKeys {
    pub fn new(secret: &SessionSecret) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Mint a token for `user` that expires `ttl` from now.
    pub fn issue(&self, user: &UserIdentity, ttl: Duration) -> Result<String, TrainerError> {
        let now = Utc::now();
        let expires = now.checked_add_signed(ttl).ok_or_else(|| {
            TrainerError::Config(figment::Error::from(format!(
                "session lifetime of {}s is out of range",
                ttl.num_seconds()
            )))
        })?;
        let claims = SessionClaims {
            sub: user.id.to_string(),
            name: user.username.clone(),
            iat: now.timestamp(),
            exp: expires.timestamp(),
        };
        Ok(encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)?)
    }
}

impl SessionAuthenticator for SessionKeys {
    fn authenticate(&self, token: &str) -> Result<UserIdentity, TrainerError> {
        let data = decode::<SessionClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            debug!(error = %e, "rejected session token");
            TrainerError::Unauthenticated
        })?;
        let id = data.claims.sub.parse::<i64>().map_err(|_| {
            debug!("session token subject is not a user id");
            TrainerError::Unauthenticated
        })?;
        Ok(UserIdentity {
            id,
            username: data.claims.name,
        })
    }
}
