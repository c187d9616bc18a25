//! User and session persistence.
//!
//! Each store is a small async trait with an in-memory implementation (dev/tests)
//! and a Postgres implementation. Handlers only ever see the trait objects.

pub mod postgres;
pub mod session_store;
pub mod user_store;

use thiserror::Error;

pub use postgres::{PostgresSessionStore, PostgresUserStore};
pub use session_store::{InMemorySessionStore, Session, SessionStore};
pub use user_store::{InMemoryUserStore, UserStore};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique constraint would be violated (e.g. duplicate email).
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("record not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub(crate) fn poisoned() -> Self {
        Self::Storage("lock poisoned".to_string())
    }
}
