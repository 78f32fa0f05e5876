//! Session manager
//!
//! Business logic for server-side sessions: issuing tokens, resolving them
//! to a `SessionState`, refreshing them on login, and destroying them on
//! logout. Expiry is enforced both here (an expired row resolves to
//! Anonymous and is reaped) and by the periodic cleanup sweep in main.

use crate::db::repositories::SessionRepository;
use crate::models::{Session, SessionState, UserRole};
use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Session manager over the session repository
pub struct SessionService {
    repo: Arc<dyn SessionRepository>,
    ttl: Duration,
}

impl SessionService {
    /// Create a session service with the given TTL in seconds
    pub fn new(repo: Arc<dyn SessionRepository>, ttl_seconds: i64) -> Self {
        Self {
            repo,
            ttl: Duration::seconds(ttl_seconds),
        }
    }

    /// The configured session lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Issue a new authenticated session, returning it with a fresh token.
    ///
    /// Expiry is set to now + TTL.
    pub async fn create(&self, username: &str, role: UserRole) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4().to_string(),
            username: username.to_string(),
            role,
            expires_at: now + self.ttl,
            created_at: now,
        };

        self.repo
            .create(&session)
            .await
            .context("Failed to create session")
    }

    /// Resolve a token to its session state.
    ///
    /// Unknown tokens, expired rows, and rows violating the
    /// authenticated-implies-username invariant all read as Anonymous.
    /// Expired rows are deleted on the way out.
    pub async fn get(&self, token: &str) -> Result<SessionState> {
        let session = match self.repo.get(token).await.context("Failed to get session")? {
            Some(s) => s,
            None => return Ok(SessionState::Anonymous),
        };

        if session.is_expired() {
            // Best effort; the periodic sweep will catch it otherwise
            let _ = self.repo.delete(token).await;
            return Ok(SessionState::Anonymous);
        }

        let state = session.state();
        if !state.is_authenticated() {
            tracing::warn!("Session row {} failed state validation", token);
        }
        Ok(state)
    }

    /// Refresh an existing session on login: merge in the username and
    /// role and push the expiry out to now + TTL.
    ///
    /// Returns true if the token referred to a live session and was
    /// refreshed, false if the caller should issue a fresh session instead.
    pub async fn touch(&self, token: &str, username: &str, role: UserRole) -> Result<bool> {
        match self.repo.get(token).await.context("Failed to get session")? {
            Some(existing) if !existing.is_expired() => {
                self.repo
                    .touch(
                        token,
                        Some(username),
                        Some(role),
                        Some(Utc::now() + self.ttl),
                    )
                    .await
                    .context("Failed to refresh session")?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Destroy a session. Destroying an unknown token is not an error.
    pub async fn destroy(&self, token: &str) -> Result<()> {
        self.repo
            .delete(token)
            .await
            .context("Failed to destroy session")
    }

    /// Delete all expired sessions, returning the number removed.
    pub async fn cleanup_expired(&self) -> Result<i64> {
        self.repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::SqlxSessionRepository;
    use crate::db::{create_test_pool, migrations};

    async fn setup_service(ttl_seconds: i64) -> SessionService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        SessionService::new(SqlxSessionRepository::boxed(pool), ttl_seconds)
    }

    #[tokio::test]
    async fn test_create_then_get_is_authenticated() {
        let service = setup_service(3600).await;

        let session = service
            .create("alice", UserRole::User)
            .await
            .expect("Failed to create session");

        let state = service.get(&session.id).await.expect("Failed to get");
        assert!(state.is_authenticated());
        assert_eq!(state.username(), Some("alice"));
    }

    #[tokio::test]
    async fn test_expiry_is_ttl_from_issuance() {
        let service = setup_service(3600).await;

        let before = Utc::now();
        let session = service
            .create("alice", UserRole::User)
            .await
            .expect("Failed to create session");
        let after = Utc::now();

        assert!(session.expires_at >= before + Duration::seconds(3600));
        assert!(session.expires_at <= after + Duration::seconds(3600));
    }

    #[tokio::test]
    async fn test_unknown_token_is_anonymous() {
        let service = setup_service(3600).await;
        let state = service.get("no-such-token").await.expect("Failed to get");
        assert_eq!(state, SessionState::Anonymous);
    }

    #[tokio::test]
    async fn test_expired_session_is_anonymous_and_reaped() {
        // Negative TTL: sessions are born expired
        let service = setup_service(-1).await;

        let session = service
            .create("alice", UserRole::User)
            .await
            .expect("Failed to create session");

        let state = service.get(&session.id).await.expect("Failed to get");
        assert_eq!(state, SessionState::Anonymous);

        // Row was reaped on read
        assert_eq!(service.cleanup_expired().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_touch_refreshes_live_session() {
        let service = setup_service(3600).await;

        let session = service
            .create("alice", UserRole::User)
            .await
            .expect("Failed to create session");

        let refreshed = service
            .touch(&session.id, "alice", UserRole::Admin)
            .await
            .expect("Failed to touch");
        assert!(refreshed);

        let state = service.get(&session.id).await.unwrap();
        match state {
            SessionState::Authenticated { role, expires_at, .. } => {
                assert_eq!(role, UserRole::Admin);
                assert!(expires_at > session.expires_at - Duration::seconds(1));
            }
            SessionState::Anonymous => panic!("Session should still be live"),
        }
    }

    #[tokio::test]
    async fn test_touch_dead_token_reports_false() {
        let service = setup_service(3600).await;
        let refreshed = service
            .touch("no-such-token", "alice", UserRole::User)
            .await
            .expect("Failed to touch");
        assert!(!refreshed);
    }

    #[tokio::test]
    async fn test_destroy_makes_get_anonymous() {
        let service = setup_service(3600).await;

        let session = service
            .create("alice", UserRole::User)
            .await
            .expect("Failed to create session");

        service.destroy(&session.id).await.expect("Failed to destroy");
        assert_eq!(
            service.get(&session.id).await.unwrap(),
            SessionState::Anonymous
        );

        // Destroy is idempotent
        service
            .destroy(&session.id)
            .await
            .expect("Repeat destroy should not error");
    }

    #[tokio::test]
    async fn test_cleanup_expired() {
        let service = setup_service(-1).await;
        service
            .create("alice", UserRole::User)
            .await
            .expect("Failed to create session");

        let removed = service.cleanup_expired().await.expect("Failed to cleanup");
        assert_eq!(removed, 1);
    }
}
