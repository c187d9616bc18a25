//! `keystone-core`: domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod pagination;

pub use error::DomainError;
pub use id::{SessionId, UserId};
pub use pagination::{Page, PageMeta, Paginated};
