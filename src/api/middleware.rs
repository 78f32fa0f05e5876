//! Shared HTTP plumbing
//!
//! Application state, session token extraction from the cookie header,
//! cookie/redirect builders, and the fallback error response for store
//! failures.

use axum::{
    http::{header, HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use std::sync::Arc;
use tera::Tera;

use crate::services::AuthService;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "session";

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub templates: Arc<Tera>,
}

/// Error response for unexpected failures (store, hashing, rendering).
///
/// The cause is logged server-side; the client only ever sees a generic
/// error page.
pub struct AppError(anyhow::Error);

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {:#}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html("<h1>Something went wrong</h1><p>Please try again later.</p>"),
        )
            .into_response()
    }
}

/// Extract the session token from the request's cookie header
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?;
    let cookie_str = cookie_header.to_str().ok()?;

    for cookie in cookie_str.split(';') {
        let cookie = cookie.trim();
        if let Some(token) = cookie.strip_prefix("session=") {
            if !token.is_empty() {
                return Some(token.to_string());
            }
        }
    }

    None
}

/// Build the Set-Cookie value binding a session token to the browser
pub fn session_cookie(token: &str, max_age_seconds: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age_seconds
    )
}

/// Build the Set-Cookie value that clears the session cookie
pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

/// 302 redirect, matching form-post-then-redirect navigation
pub fn found(location: &str) -> Response {
    (StatusCode::FOUND, [(header::LOCATION, location.to_string())]).into_response()
}

/// 302 redirect carrying a urlencoded `error` query parameter
pub fn found_with_error(path: &str, message: &str) -> Response {
    found(&format!("{}?error={}", path, urlencoding::encode(message)))
}

/// 302 redirect that also sets a cookie
pub fn found_with_cookie(location: &str, cookie: &str) -> Response {
    (
        StatusCode::FOUND,
        [
            (header::LOCATION, location.to_string()),
            (header::SET_COOKIE, cookie.to_string()),
        ],
    )
        .into_response()
}
