use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use keystone_auth::generate_token;
use keystone_core::{SessionId, UserId};

use super::StoreError;

/// How long a browser session stays valid.
pub const SESSION_MAX_AGE_DAYS: i64 = 30;

/// A persisted browser session, referenced by an opaque cookie token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub session_token: String,
    pub user_id: UserId,
    pub expires: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: SessionId::new(),
            session_token: generate_token(),
            user_id,
            expires: now + Self::max_age(),
        }
    }

    pub fn max_age() -> Duration {
        Duration::days(SESSION_MAX_AGE_DAYS)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires <= now
    }

    /// When the session was started.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.expires - Self::max_age()
    }
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, session: Session) -> Result<Session, StoreError>;

    /// The session for `token` if it is still valid. Expired sessions are
    /// removed and reported as absent.
    async fn find_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError>;

    /// Returns whether a session was removed.
    async fn delete(&self, token: &str) -> Result<bool, StoreError>;

    /// Remove every session of a user; returns how many were removed.
    async fn delete_for_user(&self, user_id: UserId) -> Result<u64, StoreError>;
}

#[async_trait]
impl<S> SessionStore for Arc<S>
where
    S: SessionStore + ?Sized,
{
    async fn create(&self, session: Session) -> Result<Session, StoreError> {
        (**self).create(session).await
    }

    async fn find_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError> {
        (**self).find_valid(token, now).await
    }

    async fn delete(&self, token: &str) -> Result<bool, StoreError> {
        (**self).delete(token).await
    }

    async fn delete_for_user(&self, user_id: UserId) -> Result<u64, StoreError> {
        (**self).delete_for_user(user_id).await
    }
}

/// In-memory session store for tests/dev, keyed by session token.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    inner: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, session: Session) -> Result<Session, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if map.contains_key(&session.session_token) {
            return Err(StoreError::Conflict("session token already exists".to_string()));
        }
        // Sessions that are never looked up again would otherwise pile up.
        let now = session.created_at();
        map.retain(|_, s| !s.is_expired(now));
        map.insert(session.session_token.clone(), session.clone());
        Ok(session)
    }

    async fn find_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        match map.get(token) {
            Some(s) if s.is_expired(now) => {
                map.remove(token);
                Ok(None)
            }
            Some(s) => Ok(Some(s.clone())),
            None => Ok(None),
        }
    }

    async fn delete(&self, token: &str) -> Result<bool, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        Ok(map.remove(token).is_some())
    }

    async fn delete_for_user(&self, user_id: UserId) -> Result<u64, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        let before = map.len();
        map.retain(|_, s| s.user_id != user_id);
        Ok((before - map.len()) as u64)
    }
}
