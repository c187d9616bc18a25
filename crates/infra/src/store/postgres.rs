//! Postgres-backed user and session stores.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Code | StoreError |
//! |------------|-----------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (other) | any | `Storage` |
//! | PoolClosed / other | N/A | `Storage` |
//!
//! Sessions reference users with `ON DELETE CASCADE`, so deleting a user removes
//! their sessions in the same statement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::instrument;

use keystone_auth::{User, UserRole};
use keystone_core::{Page, SessionId, UserId};

use super::{Session, SessionStore, StoreError, UserStore};

const USER_COLUMNS: &str = "id, name, email, email_verified, image, password, role, \
                            reset_token, reset_token_expiry, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn insert(&self, user: User) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user.id.as_uuid())
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.email_verified)
            .bind(&user.image)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.reset_token)
            .bind(user.reset_token_expiry)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("insert_user", e))?;

        user_from_row(&row).map_err(|e| map_sqlx_error("insert_user", e))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_id", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_id", e))
    }

    #[instrument(skip(self, email), err)]
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_email", e))
    }

    #[instrument(skip(self, token), err)]
    async fn find_by_reset_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE reset_token = $1 AND reset_token_expiry >= $2"
        );
        let row = sqlx::query(&sql)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_reset_token", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("find_user_by_reset_token", e))
    }

    #[instrument(skip(self), fields(page = page.page(), page_size = page.page_size()), err)]
    async fn list(&self, page: Page) -> Result<(Vec<User>, u64), StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("count_users", e))?;

        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             ORDER BY created_at DESC, id DESC \
             LIMIT $1 OFFSET $2"
        );
        let rows = sqlx::query(&sql)
            .bind(i64::from(page.page_size()))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_users", e))?;

        let users = rows
            .iter()
            .map(user_from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_sqlx_error("list_users", e))?;

        Ok((users, total.max(0) as u64))
    }

    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    async fn update(&self, user: User) -> Result<User, StoreError> {
        let sql = format!(
            "UPDATE users SET \
                name = $2, email = $3, email_verified = $4, image = $5, password = $6, \
                role = $7, reset_token = $8, reset_token_expiry = $9, updated_at = $10 \
             WHERE id = $1 \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&sql)
            .bind(user.id.as_uuid())
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.email_verified)
            .bind(&user.image)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.reset_token)
            .bind(user.reset_token_expiry)
            .bind(user.updated_at)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("update_user", e))?
            .ok_or(StoreError::NotFound)?;

        user_from_row(&row).map_err(|e| map_sqlx_error("update_user", e))
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn delete(&self, id: UserId) -> Result<Option<User>, StoreError> {
        let sql = format!("DELETE FROM users WHERE id = $1 RETURNING {USER_COLUMNS}");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user", e))?;

        row.as_ref()
            .map(user_from_row)
            .transpose()
            .map_err(|e| map_sqlx_error("delete_user", e))
    }
}

#[derive(Debug, Clone)]
pub struct PostgresSessionStore {
    pool: PgPool,
}

impl PostgresSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PostgresSessionStore {
    #[instrument(skip(self, session), fields(user_id = %session.user_id), err)]
    async fn create(&self, session: Session) -> Result<Session, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, session_token, user_id, expires)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(session.id.as_uuid())
        .bind(&session.session_token)
        .bind(session.user_id.as_uuid())
        .bind(session.expires)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("create_session", e))?;

        Ok(session)
    }

    #[instrument(skip(self, token), err)]
    async fn find_valid(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Session>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, session_token, user_id, expires
            FROM sessions
            WHERE session_token = $1
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_session", e))?;

        let Some(row) = row else {
            return Ok(None);
        };
        let session = session_from_row(&row).map_err(|e| map_sqlx_error("find_session", e))?;

        if session.is_expired(now) {
            self.delete(token).await?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    #[instrument(skip(self, token), err)]
    async fn delete(&self, token: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE session_token = $1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_session", e))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn delete_for_user(&self, user_id: UserId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_user_sessions", e))?;

        Ok(result.rows_affected())
    }
}

fn user_from_row(row: &PgRow) -> Result<User, sqlx::Error> {
    let role: String = row.try_get("role")?;
    let role = role
        .parse::<UserRole>()
        .map_err(|e| sqlx::Error::ColumnDecode {
            index: "role".to_string(),
            source: Box::new(e),
        })?;

    Ok(User {
        id: UserId::from_uuid(row.try_get("id")?),
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        email_verified: row.try_get("email_verified")?,
        image: row.try_get("image")?,
        password_hash: row.try_get("password")?,
        role,
        reset_token: row.try_get("reset_token")?,
        reset_token_expiry: row.try_get("reset_token_expiry")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn session_from_row(row: &PgRow) -> Result<Session, sqlx::Error> {
    Ok(Session {
        id: SessionId::from_uuid(row.try_get("id")?),
        session_token: row.try_get("session_token")?,
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        expires: row.try_get("expires")?,
    })
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    if is_unique_violation(&err) {
        return match &err {
            sqlx::Error::Database(db_err) => StoreError::Conflict(format!(
                "{operation}: {}",
                db_err.constraint().unwrap_or("unique constraint")
            )),
            _ => StoreError::Conflict(operation.to_string()),
        };
    }

    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::Storage(format!("database error in {operation}: {}", db_err.message()))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Storage(format!("connection pool closed in {operation}"))
        }
        other => StoreError::Storage(format!("sqlx error in {operation}: {other}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().as_deref() == Some("23505"),
        _ => false,
    }
}
