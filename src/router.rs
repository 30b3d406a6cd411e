use std::sync::Arc;

use axum::{
    Router,
    http::{Extensions, HeaderMap, StatusCode, Version},
    routing::get,
};
use chrono::{Duration, Utc};
use tower_http::{
    compression::{CompressionLayer, Predicate},
    trace::TraceLayer,
};

use crate::auth::{SessionKeys, SessionSecret};
use crate::config::WebserverConfig;
use crate::db::TrainerStorage;
use crate::error::TrainerError;
use crate::handlers::pages::{index, login_form, login_submit, logout};

/// Lifetimes and flags of the session cookie.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub session_ttl: Duration,
    pub remember_ttl: Duration,
    pub secure_cookie: bool,
}

impl SessionSettings {
    /// Both lifetimes must be positive and representable; anything else is a
    /// configuration error caught at startup.
    pub fn from_config(web: &WebserverConfig, insecure_cookie: bool) -> Result<Self, TrainerError> {
        Ok(Self {
            session_ttl: ttl_from_secs("webserver.session_ttl_secs", web.session_ttl_secs)?,
            remember_ttl: ttl_from_secs("webserver.remember_ttl_secs", web.remember_ttl_secs)?,
            secure_cookie: !insecure_cookie,
        })
    }
}

fn ttl_from_secs(key: &str, secs: i64) -> Result<Duration, TrainerError> {
    Duration::try_seconds(secs)
        .filter(|ttl| *ttl > Duration::zero() && Utc::now().checked_add_signed(*ttl).is_some())
        .ok_or_else(|| {
            TrainerError::Config(figment::Error::from(format!(
                "{key} = {secs} is not a usable session lifetime"
            )))
        })
}

#[derive(Clone)]
pub struct TrainerState {
    pub storage: TrainerStorage,
    pub sessions: Arc<SessionKeys>,
    pub settings: Arc<SessionSettings>,
}

impl TrainerState {
    /// Install `secret` as the session-signing key for every request served with this state.
    pub fn new(storage: TrainerStorage, secret: &SessionSecret, settings: SessionSettings) -> Self {
        Self {
            storage,
            sessions: Arc::new(SessionKeys::new(secret)),
            settings: Arc::new(settings),
        }
    }
}

pub fn trainer_router(state: TrainerState) -> Router {
    // only the page gets gzip, the login and logout responses stay plain
    let pages = Router::new().route("/", get(index)).layer(gzip_layer());

    Router::new()
        .merge(pages)
        .route("/login", get(login_form).post(login_submit))
        .route("/logout", get(logout))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Gzip 2xx responses for clients that accept it. Responses that already
/// carry a `Content-Encoding` pass through untouched.
fn gzip_layer() -> CompressionLayer<impl Predicate> {
    CompressionLayer::new().gzip(true).compress_when(
        |status: StatusCode, _version: Version, _headers: &HeaderMap, _ext: &Extensions| {
            status.is_success()
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_lifetimes_are_accepted() {
        let settings = SessionSettings::from_config(&WebserverConfig::default(), false).unwrap();
        assert_eq!(settings.session_ttl, Duration::hours(12));
        assert_eq!(settings.remember_ttl, Duration::days(365));
        assert!(settings.secure_cookie);
    }

    #[test]
    fn unusable_lifetimes_are_config_errors() {
        for secs in [0, -5, i64::MAX / 1000 + 1, i64::MAX] {
            let web = WebserverConfig {
                remember_ttl_secs: secs,
                ..WebserverConfig::default()
            };
            let err = SessionSettings::from_config(&web, false).unwrap_err();
            assert!(matches!(err, TrainerError::Config(_)), "accepted {secs}");
        }

        let web = WebserverConfig {
            session_ttl_secs: i64::MAX,
            ..WebserverConfig::default()
        };
        assert!(SessionSettings::from_config(&web, true).is_err());
    }
}
