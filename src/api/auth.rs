//! Signup, login, and logout handlers
//!
//! All three flows are form-post-then-redirect: failures travel back to
//! the form as a urlencoded `error` query parameter, successes set the
//! session cookie and land on /members.

use axum::{
    extract::{Query, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Form,
};
use serde::Deserialize;
use tera::Context;

use crate::api::middleware::{
    clear_session_cookie, extract_session_token, found, found_with_cookie, found_with_error,
    session_cookie, AppError, AppState,
};
use crate::services::{AuthError, LoginInput, SignupInput};

/// Optional `error` query parameter carried back to a form page
#[derive(Debug, Deserialize)]
pub struct ErrorQuery {
    pub error: Option<String>,
}

/// Signup form fields
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Login form fields
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// GET /signup - render the signup form
pub async fn signup_page(
    State(state): State<AppState>,
    Query(query): Query<ErrorQuery>,
) -> Result<Response, AppError> {
    let mut context = Context::new();
    context.insert("error_msg", &query.error);

    let html = state.templates.render("signup.html", &context)?;
    Ok(axum::response::Html(html).into_response())
}

/// POST /signupSubmit - create the credential and start a session
pub async fn signup_submit(
    State(state): State<AppState>,
    Form(form): Form<SignupForm>,
) -> Result<Response, AppError> {
    let result = state
        .auth_service
        .signup(SignupInput {
            username: form.username,
            email: form.email,
            password: form.password,
        })
        .await;

    match result {
        Ok(session) => {
            let max_age = state.auth_service.sessions().ttl().num_seconds();
            Ok(found_with_cookie(
                "/members",
                &session_cookie(&session.id, max_age),
            ))
        }
        Err(AuthError::MissingFields(fields)) => {
            let message: String = fields
                .iter()
                .map(|field| {
                    let article = if *field == "email" { "an" } else { "a" };
                    format!("Please provide {} {}. ", article, field)
                })
                .collect();
            Ok(found_with_error("/signup", message.trim_end()))
        }
        Err(AuthError::InvalidInput) => Ok(found_with_error(
            "/signup",
            "Invalid input. Please check your details.",
        )),
        Err(AuthError::IdentityConflict) => {
            Ok(found_with_error("/signup", "Username already exists."))
        }
        Err(err) => Err(err.into()),
    }
}

/// GET /login - render the login form
pub async fn login_page(
    State(state): State<AppState>,
    Query(query): Query<ErrorQuery>,
) -> Result<Response, AppError> {
    let mut context = Context::new();
    context.insert("error_msg", &query.error);

    let html = state.templates.render("login.html", &context)?;
    Ok(axum::response::Html(html).into_response())
}

/// POST /loginSubmit - verify credentials and issue or refresh a session
pub async fn login_submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let presented_token = extract_session_token(&headers);

    let result = state
        .auth_service
        .login(
            LoginInput {
                email: form.email,
                password: form.password,
            },
            presented_token.as_deref(),
        )
        .await;

    match result {
        Ok(token) => {
            let max_age = state.auth_service.sessions().ttl().num_seconds();
            Ok(found_with_cookie("/members", &session_cookie(&token, max_age)))
        }
        // Schema failure reveals nothing; back to the form without a message
        Err(AuthError::InvalidInput) | Err(AuthError::MissingFields(_)) => Ok(found("/login")),
        Err(AuthError::CredentialMismatch) => Ok(found_with_error(
            "/login",
            "Invalid email/password combination.",
        )),
        Err(err) => Err(err.into()),
    }
}

/// GET /logout - destroy the session and return home
pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if let Some(token) = extract_session_token(&headers) {
        state.auth_service.logout(&token).await?;
    }

    Ok(found_with_cookie("/", &clear_session_cookie()))
}
