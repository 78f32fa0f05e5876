//! Session model

use crate::models::UserRole;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session entity as persisted: one row per issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Session ID (opaque token)
    pub id: String,
    /// Username the session was issued for
    pub username: String,
    /// Role tag at issuance time
    pub role: UserRole,
    /// Expiration timestamp
    pub expires_at: DateTime<Utc>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }

    /// Resolve the session into a fixed-shape state.
    ///
    /// A row is only Authenticated while it is unexpired and carries a
    /// non-empty username; anything else reads as Anonymous.
    pub fn state(&self) -> SessionState {
        if self.is_expired() || self.username.is_empty() {
            SessionState::Anonymous
        } else {
            SessionState::Authenticated {
                username: self.username.clone(),
                role: self.role,
                expires_at: self.expires_at,
            }
        }
    }
}

/// The state of a browsing context, validated at every read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    /// No valid session
    Anonymous,
    /// A live, authenticated session
    Authenticated {
        username: String,
        role: UserRole,
        expires_at: DateTime<Utc>,
    },
}

impl SessionState {
    /// Whether this state represents an authenticated user
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated { .. })
    }

    /// The username, if authenticated
    pub fn username(&self) -> Option<&str> {
        match self {
            SessionState::Authenticated { username, .. } => Some(username),
            SessionState::Anonymous => None,
        }
    }
}
