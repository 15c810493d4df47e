//! User repository.

use sqlx::PgPool;

use marigold_core::{Phone, UserId};

use super::RepositoryError;
use crate::models::user::User;

/// Repository for user database operations.
pub struct UserRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get a user by their ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            SELECT id, phone, created_at, last_login_at
            FROM users
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(user)
    }

    /// Fetch the user for a phone, creating the record on first login.
    ///
    /// A single atomic upsert: concurrent first logins for the same phone
    /// both land on the same row. Updates `last_login_at` either way.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_or_create_by_phone(&self, phone: &Phone) -> Result<User, RepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r"
            INSERT INTO users (phone)
            VALUES ($1)
            ON CONFLICT (phone) DO UPDATE
            SET last_login_at = now()
            RETURNING id, phone, created_at, last_login_at
            ",
        )
        .bind(phone)
        .fetch_one(self.pool)
        .await?;

        Ok(user)
    }
}
