//! Session repository
//!
//! Database operations for session rows. Sessions are durable (they live in
//! the same SQLite database as the users) so a process restart does not log
//! anyone out.

use crate::models::{Session, UserRole};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Session repository trait
#[async_trait]
pub trait SessionRepository: Send + Sync {
    /// Create a new session row
    async fn create(&self, session: &Session) -> Result<Session>;

    /// Get session by ID (token)
    async fn get(&self, id: &str) -> Result<Option<Session>>;

    /// Partially update a session: any `Some` field is merged in.
    ///
    /// Missing rows are ignored (the caller decides whether that matters).
    async fn touch(
        &self,
        id: &str,
        username: Option<&str>,
        role: Option<UserRole>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()>;

    /// Delete a session (idempotent)
    async fn delete(&self, id: &str) -> Result<()>;

    /// Delete expired sessions, returning how many were removed
    async fn delete_expired(&self) -> Result<i64>;
}

/// SQLx-based session repository implementation
pub struct SqlxSessionRepository {
    pool: SqlitePool,
}

impl SqlxSessionRepository {
    /// Create a new SQLx session repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a boxed repository for use with dependency injection
    pub fn boxed(pool: SqlitePool) -> Arc<dyn SessionRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl SessionRepository for SqlxSessionRepository {
    async fn create(&self, session: &Session) -> Result<Session> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, username, role, expires_at, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&session.id)
        .bind(&session.username)
        .bind(session.role.to_string())
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await
        .context("Failed to create session")?;

        Ok(session.clone())
    }

    async fn get(&self, id: &str) -> Result<Option<Session>> {
        let row = sqlx::query(
            r#"
            SELECT id, username, role, expires_at, created_at
            FROM sessions
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to get session")?;

        match row {
            Some(row) => Ok(Some(row_to_session(&row)?)),
            None => Ok(None),
        }
    }

    async fn touch(
        &self,
        id: &str,
        username: Option<&str>,
        role: Option<UserRole>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET username = COALESCE(?, username),
                role = COALESCE(?, role),
                expires_at = COALESCE(?, expires_at)
            WHERE id = ?
            "#,
        )
        .bind(username)
        .bind(role.map(|r| r.to_string()))
        .bind(expires_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .context("Failed to touch session")?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .context("Failed to delete session")?;

        Ok(())
    }

    async fn delete_expired(&self) -> Result<i64> {
        let now = Utc::now();
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at < ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .context("Failed to delete expired sessions")?;

        Ok(result.rows_affected() as i64)
    }
}

fn row_to_session(row: &sqlx::sqlite::SqliteRow) -> Result<Session> {
    let role_str: String = row.get("role");
    let role = UserRole::from_str(&role_str)
        .with_context(|| format!("Invalid role in database: {}", role_str))?;

    Ok(Session {
        id: row.get("id"),
        username: row.get("username"),
        role,
        expires_at: row.get("expires_at"),
        created_at: row.get("created_at"),
    })
}
