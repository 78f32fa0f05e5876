//! Database layer
//!
//! SQLite persistence for Clubhouse. The layout:
//! - `pool`: connection pool construction
//! - `migrations`: embedded, code-based schema migrations
//! - `repositories`: trait-based data access per entity
//!
//! Identity-key uniqueness (username, email) is enforced by UNIQUE
//! constraints in the schema; application code treats the resulting
//! constraint violation as the sole conflict signal.

pub mod migrations;
pub mod pool;
pub mod repositories;

pub use pool::{create_pool, create_test_pool};
