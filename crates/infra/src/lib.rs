//! Infrastructure layer: configuration, persistence, outbound mail.

pub mod config;
pub mod db;
pub mod mailer;
pub mod store;

pub use config::{AppConfig, ConfigError};
pub use mailer::{LogMailer, Mailer, MailerError, MemoryMailer, SentMail};
pub use store::{
    InMemorySessionStore, InMemoryUserStore, PostgresSessionStore, PostgresUserStore, Session,
    SessionStore, StoreError, UserStore,
};
