//! HTTP layer - handlers and routing
//!
//! Form-based pages and auth flows:
//! - Landing page reflecting authentication state
//! - Signup form and submit
//! - Login form and submit
//! - Auth-gated members page
//! - Logout
//! - Static files under /public, 404 fallback

pub mod auth;
pub mod middleware;
pub mod pages;

use axum::{
    routing::{get, post},
    Router,
};
use tera::Tera;
use tower_http::{services::ServeDir, trace::TraceLayer};

pub use middleware::{AppError, AppState};

/// Load the embedded page templates
pub fn load_templates() -> tera::Result<Tera> {
    let mut tera = Tera::default();
    tera.add_raw_templates(vec![
        ("index.html", include_str!("../../templates/index.html")),
        ("signup.html", include_str!("../../templates/signup.html")),
        ("login.html", include_str!("../../templates/login.html")),
        ("members.html", include_str!("../../templates/members.html")),
        ("404.html", include_str!("../../templates/404.html")),
    ])?;
    Ok(tera)
}

/// Build the application router
pub fn build_router(state: AppState, public_dir: &str) -> Router {
    Router::new()
        .route("/", get(pages::index))
        .route("/signup", get(auth::signup_page))
        .route("/signupSubmit", post(auth::signup_submit))
        .route("/login", get(auth::login_page))
        .route("/loginSubmit", post(auth::login_submit))
        .route("/members", get(pages::members))
        .route("/logout", get(auth::logout))
        .nest_service("/public", ServeDir::new(public_dir))
        .fallback(pages::not_found)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::services::{AuthService, SessionService};
    use axum::http::StatusCode;
    use axum_test::TestServer;
    use std::sync::Arc;

    async fn test_server() -> TestServer {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let sessions = Arc::new(SessionService::new(
            SqlxSessionRepository::boxed(pool.clone()),
            3600,
        ));
        let auth_service = Arc::new(AuthService::new(
            SqlxUserRepository::boxed(pool),
            sessions,
        ));
        let templates = Arc::new(load_templates().expect("Failed to load templates"));

        let state = AppState {
            auth_service,
            templates,
        };

        let mut server =
            TestServer::new(build_router(state, "public")).expect("Failed to start test server");
        server.save_cookies();
        server
    }

    fn signup_form(username: &str, email: &str, password: &str) -> Vec<(&'static str, String)> {
        vec![
            ("username", username.to_string()),
            ("email", email.to_string()),
            ("password", password.to_string()),
        ]
    }

    fn login_form(email: &str, password: &str) -> Vec<(&'static str, String)> {
        vec![
            ("email", email.to_string()),
            ("password", password.to_string()),
        ]
    }

    fn location(response: &axum_test::TestResponse) -> String {
        response
            .header("location")
            .to_str()
            .expect("Location header should be valid UTF-8")
            .to_string()
    }

    #[tokio::test]
    async fn test_index_anonymous() {
        let server = test_server().await;

        let response = server.get("/").await;
        response.assert_status_ok();
        assert!(!response.text().contains("Logged in as"));
    }

    #[tokio::test]
    async fn test_signup_login_members_logout_roundtrip() {
        let server = test_server().await;

        // Sign up
        let response = server
            .post("/signupSubmit")
            .form(&signup_form("alice", "a@x.com", "Passw0rd1"))
            .await;
        response.assert_status(StatusCode::FOUND);
        assert_eq!(location(&response), "/members");

        // Members page greets her
        let response = server.get("/members").await;
        response.assert_status_ok();
        assert!(response.text().contains("alice"));

        // Index now reflects the authenticated state
        let response = server.get("/").await;
        response.assert_status_ok();
        assert!(response.text().contains("alice"));

        // Log out
        let response = server.get("/logout").await;
        response.assert_status(StatusCode::FOUND);
        assert_eq!(location(&response), "/");

        // Members page is gated again
        let response = server.get("/members").await;
        response.assert_status(StatusCode::FOUND);
        assert_eq!(location(&response), "/login");

        // Log back in
        let response = server
            .post("/loginSubmit")
            .form(&login_form("a@x.com", "Passw0rd1"))
            .await;
        response.assert_status(StatusCode::FOUND);
        assert_eq!(location(&response), "/members");

        let response = server.get("/members").await;
        response.assert_status_ok();
        assert!(response.text().contains("alice"));
    }

    #[tokio::test]
    async fn test_signup_reports_all_missing_fields_at_once() {
        let server = test_server().await;

        let response = server
            .post("/signupSubmit")
            .form(&signup_form("", "a@x.com", ""))
            .await;
        response.assert_status(StatusCode::FOUND);

        let location = location(&response);
        assert!(location.starts_with("/signup?error="));
        let decoded = urlencoding::decode(&location).unwrap();
        assert!(decoded.contains("Please provide a username."));
        assert!(decoded.contains("Please provide a password."));
        assert!(!decoded.contains("email"));

        // Nothing was persisted; logging in with those details fails
        let response = server
            .post("/loginSubmit")
            .form(&login_form("a@x.com", "anything"))
            .await;
        assert!(location_of(&response).contains("Invalid"));
    }

    fn location_of(response: &axum_test::TestResponse) -> String {
        let raw = response
            .header("location")
            .to_str()
            .expect("Location header should be valid UTF-8")
            .to_string();
        urlencoding::decode(&raw).unwrap().into_owned()
    }

    #[tokio::test]
    async fn test_signup_invalid_input_is_generic() {
        let server = test_server().await;

        let response = server
            .post("/signupSubmit")
            .form(&signup_form("alice!", "a@x.com", "Passw0rd1"))
            .await;
        response.assert_status(StatusCode::FOUND);

        let decoded = location_of(&response);
        assert!(decoded.contains("Invalid input. Please check your details."));
        // The offending field is never named
        assert!(!decoded.contains("username"));
    }

    #[tokio::test]
    async fn test_duplicate_signup_conflicts_and_keeps_first_credential() {
        let server = test_server().await;

        server
            .post("/signupSubmit")
            .form(&signup_form("alice", "a@x.com", "Passw0rd1"))
            .await
            .assert_status(StatusCode::FOUND);

        let response = server
            .post("/signupSubmit")
            .form(&signup_form("alice", "other@x.com", "Different9"))
            .await;
        response.assert_status(StatusCode::FOUND);
        assert!(location_of(&response).contains("Username already exists."));

        // The original credential still logs in
        let response = server
            .post("/loginSubmit")
            .form(&login_form("a@x.com", "Passw0rd1"))
            .await;
        assert_eq!(location(&response), "/members");
    }

    #[tokio::test]
    async fn test_login_failures_are_indistinguishable() {
        let server = test_server().await;

        server
            .post("/signupSubmit")
            .form(&signup_form("alice", "a@x.com", "Passw0rd1"))
            .await
            .assert_status(StatusCode::FOUND);
        server.get("/logout").await.assert_status(StatusCode::FOUND);

        let unknown = server
            .post("/loginSubmit")
            .form(&login_form("ghost@x.com", "Passw0rd1"))
            .await;
        let wrong = server
            .post("/loginSubmit")
            .form(&login_form("a@x.com", "WrongPass"))
            .await;

        unknown.assert_status(StatusCode::FOUND);
        wrong.assert_status(StatusCode::FOUND);
        assert_eq!(location(&unknown), location(&wrong));
        assert!(location_of(&unknown).contains("Invalid email/password combination."));
    }

    #[tokio::test]
    async fn test_login_bad_email_format_redirects_without_detail() {
        let server = test_server().await;

        let response = server
            .post("/loginSubmit")
            .form(&login_form("not-an-email", "whatever"))
            .await;
        response.assert_status(StatusCode::FOUND);
        assert_eq!(location(&response), "/login");
    }

    #[tokio::test]
    async fn test_logout_without_session_is_harmless() {
        let server = test_server().await;

        let response = server.get("/logout").await;
        response.assert_status(StatusCode::FOUND);
        assert_eq!(location(&response), "/");
    }

    #[tokio::test]
    async fn test_unknown_route_renders_404() {
        let server = test_server().await;

        let response = server.get("/does-not-exist").await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_signup_error_is_shown_on_form_page() {
        let server = test_server().await;

        let response = server
            .get("/signup")
            .add_query_param("error", "Username already exists.")
            .await;
        response.assert_status_ok();
        assert!(response.text().contains("Username already exists."));
    }
}
