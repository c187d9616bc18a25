use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use keystone_auth::User;
use keystone_core::{Page, UserId};

use super::StoreError;

/// User account storage.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user. Fails with `Conflict` when the email is taken.
    async fn insert(&self, user: User) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// The user holding `token`, if it has not expired at `now`.
    async fn find_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError>;

    /// One page of users, newest first, plus the total user count.
    async fn list(&self, page: Page) -> Result<(Vec<User>, u64), StoreError>;

    /// Replace a stored user. `NotFound` if it does not exist, `Conflict` if the
    /// new email belongs to someone else.
    async fn update(&self, user: User) -> Result<User, StoreError>;

    /// Remove a user, returning what was removed.
    async fn delete(&self, id: UserId) -> Result<Option<User>, StoreError>;
}

#[async_trait]
impl<S> UserStore for Arc<S>
where
    S: UserStore + ?Sized,
{
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        (**self).insert(user).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        (**self).find_by_email(email).await
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        (**self).find_by_reset_token(token, now).await
    }

    async fn list(&self, page: Page) -> Result<(Vec<User>, u64), StoreError> {
        (**self).list(page).await
    }

    async fn update(&self, user: User) -> Result<User, StoreError> {
        (**self).update(user).await
    }

    async fn delete(&self, id: UserId) -> Result<Option<User>, StoreError> {
        (**self).delete(id).await
    }
}

/// In-memory user store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    inner: RwLock<HashMap<UserId, User>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn email_taken(map: &HashMap<UserId, User>, email: &str, except: Option<UserId>) -> bool {
        map.values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if Self::email_taken(&map, &user.email, None) {
            return Err(StoreError::Conflict(format!("email '{}' already exists", user.email)));
        }
        if map.contains_key(&user.id) {
            return Err(StoreError::Conflict(format!("user {} already exists", user.id)));
        }
        map.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(map.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(map.values().find(|u| u.email == email).cloned())
    }

    async fn find_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        Ok(map
            .values()
            .find(|u| u.has_valid_reset_token(token, now))
            .cloned())
    }

    async fn list(&self, page: Page) -> Result<(Vec<User>, u64), StoreError> {
        let map = self.inner.read().map_err(|_| StoreError::poisoned())?;
        let mut users: Vec<&User> = map.values().collect();
        // Newest first; ids are time-ordered so they break timestamp ties.
        users.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.as_uuid().cmp(a.id.as_uuid()))
        });

        let total = users.len() as u64;
        let data = users
            .into_iter()
            .skip(page.offset() as usize)
            .take(page.page_size() as usize)
            .cloned()
            .collect();
        Ok((data, total))
    }

    async fn update(&self, user: User) -> Result<User, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        if !map.contains_key(&user.id) {
            return Err(StoreError::NotFound);
        }
        if Self::email_taken(&map, &user.email, Some(user.id)) {
            return Err(StoreError::Conflict(format!("email '{}' already exists", user.email)));
        }
        map.insert(user.id, user.clone());
        Ok(user)
    }

    async fn delete(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let mut map = self.inner.write().map_err(|_| StoreError::poisoned())?;
        Ok(map.remove(&id))
    }
}
