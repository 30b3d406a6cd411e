use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::CookieJar;

use crate::auth::{SESSION_COOKIE, SessionAuthenticator, UserIdentity};
use crate::error::TrainerError;
use crate::router::TrainerState;

/// Resolve the request's session cookie to a live user.
///
/// The token must validate against the installation secret, and the user it
/// names must still exist with the same username.
pub async fn authenticate_request(
    parts: &Parts,
    state: &TrainerState,
) -> Result<UserIdentity, TrainerError> {
    let jar = CookieJar::from_headers(&parts.headers);
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_owned())
        .ok_or(TrainerError::Unauthenticated)?;

    let claimed = state.sessions.authenticate(&token)?;

    match state.storage.get_user(claimed.id).await? {
        Some(user) if user.username == claimed.username => Ok(user.into()),
        _ => Err(TrainerError::Unauthenticated),
    }
}

/// Extractor gate for pages that need a signed-in user. Rejects with a
/// redirect to the login page.
#[derive(Debug, Clone)]
pub struct RequireSession(pub UserIdentity);

impl FromRequestParts<TrainerState> for RequireSession {
    type Rejection = TrainerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &TrainerState,
    ) -> Result<Self, Self::Rejection> {
        authenticate_request(parts, state).await.map(Self)
    }
}
