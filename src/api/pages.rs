//! Page handlers: index, members area, and the 404 fallback

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Response},
};
use tera::Context;

use crate::api::middleware::{extract_session_token, found, AppError, AppState};
use crate::models::SessionState;

/// Resolve the request's cookie to a session state, anonymously when no
/// token is presented.
async fn current_session(state: &AppState, headers: &HeaderMap) -> Result<SessionState, AppError> {
    match extract_session_token(headers) {
        Some(token) => Ok(state.auth_service.session_state(&token).await?),
        None => Ok(SessionState::Anonymous),
    }
}

/// GET / - landing page reflecting authentication state
pub async fn index(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let session = current_session(&state, &headers).await?;

    let mut context = Context::new();
    context.insert("authenticated", &session.is_authenticated());
    context.insert("username", &session.username());

    let html = state.templates.render("index.html", &context)?;
    Ok(Html(html).into_response())
}

/// GET /members - auth-gated members page
pub async fn members(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    let session = current_session(&state, &headers).await?;

    let username = match session.username() {
        Some(username) => username.to_string(),
        None => return Ok(found("/login")),
    };

    let mut context = Context::new();
    context.insert("username", &username);

    let html = state.templates.render("members.html", &context)?;
    Ok(Html(html).into_response())
}

/// Fallback handler for unmatched routes
pub async fn not_found(State(state): State<AppState>) -> Result<Response, AppError> {
    let html = state.templates.render("404.html", &Context::new())?;
    Ok((StatusCode::NOT_FOUND, Html(html)).into_response())
}
