//! Application services: the business rules behind the HTTP handlers.
//!
//! `AppServices` owns the stores, mailer and token signer, and is shared with
//! handlers as `Extension<Arc<AppServices>>`.

use std::sync::Arc;

use tokio::sync::OnceCell;

use keystone_auth::{Hs256Jwt, JwtValidator, PasswordPolicy, hash_password, verify_password};
use keystone_core::DomainError;
use keystone_infra::db::PgPool;
use keystone_infra::{
    AppConfig, InMemorySessionStore, InMemoryUserStore, LogMailer, Mailer, PostgresSessionStore,
    PostgresUserStore, SessionStore, UserStore,
};

use crate::app::errors::ApiError;

pub mod auth;
pub mod users;

pub struct AppServices {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    mailer: Arc<dyn Mailer>,
    jwt: Arc<Hs256Jwt>,
    policy: PasswordPolicy,
    config: AppConfig,
    /// Hash checked when the account has none, so misses cost one bcrypt run too.
    decoy_hash: OnceCell<String>,
}

impl AppServices {
    pub fn new(
        config: AppConfig,
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let jwt = Arc::new(Hs256Jwt::new(config.jwt_secret.as_bytes(), config.jwt_ttl));
        Self {
            users,
            sessions,
            mailer,
            jwt,
            policy: PasswordPolicy::default(),
            config,
            decoy_hash: OnceCell::new(),
        }
    }

    /// Process-local stores; data is lost on restart.
    pub fn in_memory(config: AppConfig) -> Self {
        Self::new(
            config,
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemorySessionStore::new()),
            Arc::new(LogMailer),
        )
    }

    pub fn postgres(config: AppConfig, pool: PgPool) -> Self {
        Self::new(
            config,
            Arc::new(PostgresUserStore::new(pool.clone())),
            Arc::new(PostgresSessionStore::new(pool)),
            Arc::new(LogMailer),
        )
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn jwt_validator(&self) -> Arc<dyn JwtValidator> {
        self.jwt.clone()
    }

    /// bcrypt is CPU bound; keep it off the async workers.
    async fn hash(&self, plain: &str) -> Result<String, ApiError> {
        let plain = plain.to_string();
        let cost = self.config.bcrypt_cost;
        tokio::task::spawn_blocking(move || hash_password(&plain, cost))
            .await
            .map_err(|e| ApiError::Internal(format!("hashing task failed: {e}")))?
            .map_err(ApiError::from)
    }

    async fn verify(&self, plain: &str, hash: &str) -> Result<bool, ApiError> {
        let plain = plain.to_string();
        let hash = hash.to_string();
        let verified = tokio::task::spawn_blocking(move || verify_password(&plain, &hash))
            .await
            .map_err(|e| ApiError::Internal(format!("verification task failed: {e}")))?;

        match verified {
            Ok(ok) => Ok(ok),
            Err(e) => {
                tracing::warn!(error = %e, "stored password hash could not be verified");
                Ok(false)
            }
        }
    }

    /// Burn one verification against a throwaway hash at the configured cost.
    async fn verify_decoy(&self, plain: &str) -> Result<(), ApiError> {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| self.hash("keystone-decoy-password"))
            .await?;
        self.verify(plain, decoy).await?;
        Ok(())
    }

    fn check_password_policy(&self, password: &str) -> Result<(), ApiError> {
        self.policy
            .validate(password)
            .map_err(|violations| DomainError::Validation(violations).into())
    }
}
