//! Auth flow controller
//!
//! Orchestrates signup and login: input validation, credential store
//! access, password hashing/verification, and session issuance. Every
//! failure is terminal for the request; there is no retry logic anywhere
//! in this flow.

use crate::db::repositories::{InsertOutcome, UserRepository};
use crate::models::{Session, SessionState, User, UserRole};
use crate::services::password::{hash_password, verify_password};
use crate::services::session::SessionService;
use crate::services::validator::{self, FieldSchema, Format, ValidationError};
use anyhow::Context;
use std::collections::HashMap;
use std::sync::Arc;

/// Error types for auth flow operations
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Required fields were empty; names every missing field at once
    #[error("missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<&'static str>),

    /// Input failed schema validation. Deliberately carries no field
    /// detail; that is logged server-side only.
    #[error("invalid input")]
    InvalidInput,

    /// An identity key is already taken (signup)
    #[error("identity key already exists")]
    IdentityConflict,

    /// Unknown identity key or wrong password (login). One variant for
    /// both, so callers cannot distinguish them.
    #[error("invalid credential combination")]
    CredentialMismatch,

    /// Store or hashing failure; fatal for the request
    #[error("internal error: {0}")]
    Store(#[from] anyhow::Error),
}

/// Signup form payload
#[derive(Debug, Clone)]
pub struct SignupInput {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Login form payload
#[derive(Debug, Clone)]
pub struct LoginInput {
    pub email: String,
    pub password: String,
}

/// Auth flow controller
pub struct AuthService {
    user_repo: Arc<dyn UserRepository>,
    sessions: Arc<SessionService>,
}

fn signup_schema() -> Vec<FieldSchema> {
    vec![
        FieldSchema::new("username", Format::Alphanumeric).max_len(20),
        FieldSchema::new("email", Format::Email),
        FieldSchema::new("password", Format::Text).max_len(20),
    ]
}

fn login_schema() -> Vec<FieldSchema> {
    vec![
        FieldSchema::new("email", Format::Email),
        FieldSchema::new("password", Format::Text),
    ]
}

impl AuthService {
    /// Create a new auth service
    pub fn new(user_repo: Arc<dyn UserRepository>, sessions: Arc<SessionService>) -> Self {
        Self {
            user_repo,
            sessions,
        }
    }

    /// Access to the session manager (for logout and gating)
    pub fn sessions(&self) -> &SessionService {
        &self.sessions
    }

    /// Sign up a new user and issue a session for them.
    ///
    /// Steps, each terminal on failure with nothing persisted:
    /// 1. presence check, all missing fields reported at once
    /// 2. schema validation (alphanumeric username <= 20, valid email,
    ///    password <= 20); detail is logged, not returned
    /// 3. hash + insert; the UNIQUE constraint on the identity keys is the
    ///    only conflict check, so the insert is attempted exactly once
    /// 4. session issuance
    pub async fn signup(&self, input: SignupInput) -> Result<Session, AuthError> {
        let payload = HashMap::from([
            ("username".to_string(), input.username),
            ("email".to_string(), input.email),
            ("password".to_string(), input.password),
        ]);

        let normalized = validator::validate(&signup_schema(), &payload).map_err(|e| match e {
            ValidationError::MissingFields(fields) => AuthError::MissingFields(fields),
            ValidationError::InvalidFormat(violations) => {
                tracing::info!("Signup rejected: {:?}", violations);
                AuthError::InvalidInput
            }
        })?;

        let username = &normalized["username"];
        let email = &normalized["email"];
        let password = &normalized["password"];

        let password_hash = hash_password(password).context("Failed to hash password")?;

        let user = User::new(
            username.clone(),
            email.clone(),
            password_hash,
            UserRole::User,
        );

        let created = match self
            .user_repo
            .insert(&user)
            .await
            .context("Failed to insert user")?
        {
            InsertOutcome::Created(user) => user,
            InsertOutcome::Conflict => return Err(AuthError::IdentityConflict),
        };

        tracing::info!("Registered user {}", created.username);

        let session = self
            .sessions
            .create(&created.username, created.role)
            .await
            .context("Failed to issue session")?;

        Ok(session)
    }

    /// Log in with email and password, returning the session token to bind
    /// to the cookie.
    ///
    /// An unknown email and a wrong password produce the identical
    /// `CredentialMismatch`; the caller cannot tell which it was. If the
    /// request presented a still-live session token it is refreshed in
    /// place, otherwise a fresh session is issued.
    pub async fn login(
        &self,
        input: LoginInput,
        presented_token: Option<&str>,
    ) -> Result<String, AuthError> {
        let payload = HashMap::from([
            ("email".to_string(), input.email),
            ("password".to_string(), input.password),
        ]);

        let normalized = validator::validate(&login_schema(), &payload).map_err(|e| {
            tracing::info!("Login rejected before lookup: {}", e);
            AuthError::InvalidInput
        })?;

        let email = &normalized["email"];
        let password = &normalized["password"];

        let user = match self
            .user_repo
            .find_by_email(email)
            .await
            .context("Failed to look up user")?
        {
            Some(user) => user,
            None => {
                tracing::info!("Login failed: unknown identity");
                return Err(AuthError::CredentialMismatch);
            }
        };

        // Always verify against the stored hash; there is no branch that
        // skips the comparison.
        if !verify_password(password, &user.password_hash) {
            tracing::info!("Login failed: credential mismatch for {}", user.username);
            return Err(AuthError::CredentialMismatch);
        }

        if let Some(token) = presented_token {
            let refreshed = self
                .sessions
                .touch(token, &user.username, user.role)
                .await
                .context("Failed to refresh session")?;
            if refreshed {
                tracing::debug!("Refreshed session for {}", user.username);
                return Ok(token.to_string());
            }
        }

        let session = self
            .sessions
            .create(&user.username, user.role)
            .await
            .context("Failed to issue session")?;

        tracing::info!("Logged in {}", user.username);
        Ok(session.id)
    }

    /// Destroy the session behind a token. Idempotent.
    pub async fn logout(&self, token: &str) -> Result<(), AuthError> {
        self.sessions.destroy(token).await?;
        Ok(())
    }

    /// Resolve a token to its session state.
    pub async fn session_state(&self, token: &str) -> Result<SessionState, AuthError> {
        Ok(self.sessions.get(token).await?)
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
