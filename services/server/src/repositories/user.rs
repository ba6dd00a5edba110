//! PostgreSQL user repository

use async_trait::async_trait;
use common::error::{DatabaseError, DatabaseResult};
use sqlx::PgPool;
use tracing::info;
use uuid::Uuid;

use super::UserStore;
use crate::models::{NewUser, Provider, User};

const USER_COLUMNS: &str = "id, email, password_hash, google_id, github_id, created_at, updated_at";

/// Column holding the provider-specific account id
fn provider_column(provider: Provider) -> DatabaseResult<&'static str> {
    match provider {
        Provider::Google => Ok("google_id"),
        Provider::GitHub => Ok("github_id"),
        Provider::Local => Err(DatabaseError::Configuration(
            "local accounts are not linked by provider id".to_string(),
        )),
    }
}

/// User repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn find_by_id(&self, id: Uuid) -> DatabaseResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);

        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn create(&self, new_user: &NewUser) -> DatabaseResult<User> {
        info!("Creating new user: {}", new_user.email);

        let sql = format!(
            r#"
            INSERT INTO users (id, email, password_hash)
            VALUES ($1, $2, $3)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&new_user.email)
            .bind(&new_user.password_hash)
            .fetch_one(&self.pool)
            .await
            .map_err(DatabaseError::from_query)
    }

    async fn upsert_oauth(
        &self,
        provider: Provider,
        provider_id: &str,
        email: &str,
    ) -> DatabaseResult<User> {
        let column = provider_column(provider)?;

        let sql = format!("SELECT {} FROM users WHERE {} = $1", USER_COLUMNS, column);
        let existing = sqlx::query_as::<_, User>(&sql)
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::Query)?;

        if let Some(user) = existing {
            return Ok(user);
        }

        info!("Linking {} account {} to {}", provider, provider_id, email);

        // An existing account is only linked when it has no password and no
        // other identity from this provider; otherwise no row comes back
        let sql = format!(
            r#"
            INSERT INTO users (id, email, {column})
            VALUES ($1, $2, $3)
            ON CONFLICT (email) DO UPDATE
            SET {column} = EXCLUDED.{column},
                updated_at = NOW()
            WHERE users.password_hash IS NULL AND users.{column} IS NULL
            RETURNING {columns}
            "#,
            column = column,
            columns = USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(email)
            .bind(provider_id)
            .fetch_optional(&self.pool)
            .await
            .map_err(DatabaseError::from_query)?
            .ok_or_else(|| DatabaseError::UniqueViolation("users_email_key".to_string()))
    }
}
