//! User repository for database operations
//!
//! PostgreSQL implementation of the credential store. Password hashing happens
//! in the auth layer; this repository only ever sees bcrypt digests.

use sqlx::{FromRow, PgPool};

use crate::core::db::models::{NewUser, Role, User};
use crate::core::db::store::{CredentialStore, StoreError};

/// Postgres error code for unique_violation
const UNIQUE_VIOLATION: &str = "23505";

/// Raw row as stored in the `users` table
#[derive(Debug, FromRow)]
struct UserRow {
    identifier: String,
    password_hash: String,
    name: Option<String>,
    role: String,
    is_online: bool,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role: Role = row.role.parse().map_err(StoreError::Corrupt)?;
        Ok(User {
            identifier: row.identifier,
            password_hash: row.password_hash,
            name: row.name,
            role,
            is_online: row.is_online,
            created_at: row.created_at,
        })
    }
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Delete a user by identifier
    #[cfg(test)]
    pub async fn delete(&self, identifier: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            DELETE FROM users
            WHERE identifier = $1
            "#,
        )
        .bind(identifier)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(
        err,
        sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some(UNIQUE_VIOLATION)
    )
}

impl CredentialStore for UserRepository {
    async fn find_by_identifier(&self, identifier: &str) -> Result<Option<User>, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT identifier, password_hash, name, role, is_online, created_at
            FROM users
            WHERE identifier = $1
            "#,
        )
        .bind(identifier)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let result = sqlx::query_as::<_, UserRow>(
            r#"
            INSERT INTO users (identifier, password_hash, name, role, is_online)
            VALUES ($1, $2, $3, $4, FALSE)
            RETURNING identifier, password_hash, name, role, is_online, created_at
            "#,
        )
        .bind(&new_user.identifier)
        .bind(&new_user.password_hash)
        .bind(&new_user.name)
        .bind(new_user.role.to_string())
        .fetch_one(&self.pool)
        .await;

        match result {
            Ok(row) => User::try_from(row),
            // The unique index is the source of truth for concurrent registrations
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::DuplicateIdentifier(new_user.identifier))
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn set_online(&self, identifier: &str, online: bool) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_online = $2
            WHERE identifier = $1
            "#,
        )
        .bind(identifier)
        .bind(online)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn try_mark_online(&self, identifier: &str) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET is_online = TRUE
            WHERE identifier = $1 AND is_online = FALSE
            "#,
        )
        .bind(identifier)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn list(&self) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT identifier, password_hash, name, role, is_online, created_at
            FROM users
            ORDER BY created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(User::try_from).collect()
    }
}
