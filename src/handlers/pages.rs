use axum::{
    Form,
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use time::Duration;
use tracing::{info, warn};

use crate::auth::password::verify_password;
use crate::auth::{SESSION_COOKIE, UserIdentity};
use crate::error::TrainerError;
use crate::middleware::RequireSession;
use crate::router::{SessionSettings, TrainerState};

pub const INVALID_LOGIN: &str = "Invalid username or password";
pub const MISSING_FIELDS: &str = "Username and password are required";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    /// Checkbox; present (any value) when ticked.
    pub remember: Option<String>,
}

/// GET / -> the trainer page, signed-in users only.
pub async fn index(RequireSession(user): RequireSession) -> Html<String> {
    Html(format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Cyborg ear trainer</title></head>
<body>
<h1>Cyborg ear trainer</h1>
<p>Signed in as {}</p>
<p><a href="/logout">Log out</a></p>
</body>
</html>
"#,
        escape_html(&user.username)
    ))
}

/// GET /login
pub async fn login_form() -> Html<String> {
    login_page(None)
}

/// POST /login -> sets the session cookie and redirects to `/` on success,
/// re-renders the form otherwise.
pub async fn login_submit(
    State(state): State<TrainerState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, TrainerError> {
    let username = form.username.trim();
    if username.is_empty() || form.password.is_empty() {
        return Ok(login_page(Some(MISSING_FIELDS)).into_response());
    }

    let Some(user) = state.storage.find_user_by_username(username).await? else {
        warn!(username, "login for unknown user");
        return Ok(login_page(Some(INVALID_LOGIN)).into_response());
    };

    match verify_password(&form.password, &user.password).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(username, "login with wrong password");
            return Ok(login_page(Some(INVALID_LOGIN)).into_response());
        }
        Err(e) => {
            warn!(username, error = %e, "stored password hash is unusable");
            return Ok(login_page(Some(INVALID_LOGIN)).into_response());
        }
    }

    let remember = form.remember.is_some();
    let settings = &state.settings;
    let ttl = if remember {
        settings.remember_ttl
    } else {
        settings.session_ttl
    };
    let identity = UserIdentity::from(user);
    let token = state.sessions.issue(&identity, ttl)?;

    info!(user_id = identity.id, remember, "user logged in");
    let jar = jar.add(session_cookie(token, settings, remember));
    Ok((jar, Redirect::to("/")).into_response())
}

/// GET /logout
pub async fn logout(RequireSession(user): RequireSession, jar: CookieJar) -> impl IntoResponse {
    info!(user_id = user.id, "user logged out");
    let jar = jar.remove(Cookie::build(Cookie::new(SESSION_COOKIE, "")).path("/"));
    (jar, Html("<p>Logged out</p>"))
}

fn login_page(error: Option<&str>) -> Html<String> {
    let error_html = error
        .map(|msg| format!(r#"<p class="error">{}</p>"#, escape_html(msg)))
        .unwrap_or_default();
    Html(format!(
        r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>Login</title></head>
<body>
<h1>Please sign in</h1>
{error_html}
<form method="post" action="/login">
<input type="text" name="username" placeholder="username" required>
<input type="password" name="password" placeholder="password" required>
<label><input type="checkbox" name="remember"> remember me</label>
<button type="submit">Sign in</button>
</form>
</body>
</html>
"#
    ))
}

/// Browser-session cookie unless `remember`, in which case it outlives the browser.
fn session_cookie(token: String, settings: &SessionSettings, remember: bool) -> Cookie<'static> {
    let builder = Cookie::build(Cookie::new(SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.secure_cookie);
    if remember {
        builder
            .max_age(Duration::seconds(settings.remember_ttl.num_seconds()))
            .build()
    } else {
        builder.build()
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}
