//! Data models
//!
//! Entities persisted by Clubhouse:
//! - `User`: a credential record binding an identity key to a password hash
//! - `Session`: a server-side record of an authenticated browsing context

mod session;
mod user;

pub use session::{Session, SessionState};
pub use user::{User, UserRole};
