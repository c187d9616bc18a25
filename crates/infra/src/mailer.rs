//! Outbound email.
//!
//! No delivery provider is wired in; `LogMailer` writes the message to the log so
//! the reset link can be picked up from there during development.

use std::sync::Mutex;

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("failed to send mail: {0}")]
    Send(String),
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<(), MailerError>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<(), MailerError> {
        info!(to, reset_url, "password reset email");
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMail {
    pub to: String,
    pub reset_url: String,
}

/// Keeps every message in memory; used by tests to read reset links back.
#[derive(Debug, Default)]
pub struct MemoryMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send_password_reset(&self, to: &str, reset_url: &str) -> Result<(), MailerError> {
        let mut sent = self
            .sent
            .lock()
            .map_err(|_| MailerError::Send("mailbox lock poisoned".to_string()))?;
        sent.push(SentMail {
            to: to.to_string(),
            reset_url: reset_url.to_string(),
        });
        Ok(())
    }
}
