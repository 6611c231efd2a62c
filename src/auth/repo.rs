use async_trait::async_trait;
use sqlx::{types::Json, PgPool};
use thiserror::Error;

use crate::auth::{
    history::LoginHistory,
    repo_types::{User, UserRow},
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user name already exists: {0}")]
    DuplicateKey(String),
    #[error("no user named {0}")]
    NotFound(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        Self::Backend(e.into())
    }
}

/// Keyed persistence for user records. Keys are unique user names.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_user_name(&self, user_name: &str) -> Result<Option<User>, StoreError>;
    async fn insert(&self, user: &User) -> Result<(), StoreError>;
    async fn update_history(
        &self,
        user_name: &str,
        history: &LoginHistory,
    ) -> Result<(), StoreError>;
}

#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn find_by_user_name(&self, user_name: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT user_name, password_hash, email, login_history
            FROM users
            WHERE user_name = $1
            "#,
        )
        .bind(user_name)
        .fetch_optional(&self.db)
        .await?;
        Ok(row.map(User::from))
    }

    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (user_name, password_hash, email, login_history)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(&user.user_name)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(Json(&user.login_history))
        .execute(&self.db)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicateKey(user.user_name.clone())
            }
            other => other.into(),
        })?;
        Ok(())
    }

    async fn update_history(
        &self,
        user_name: &str,
        history: &LoginHistory,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
               SET login_history = $2
             WHERE user_name = $1
            "#,
        )
        .bind(user_name)
        .bind(Json(history))
        .execute(&self.db)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(user_name.to_string()));
        }
        Ok(())
    }
}
