//! OTP challenge repository.
//!
//! The table keys on the normalized phone number, so the upsert here is
//! the "at most one live challenge per phone" invariant: a new send
//! atomically replaces whatever challenge existed before it. Attempt
//! counting is a single atomic UPDATE, never read-modify-write.

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use marigold_core::Phone;

use super::RepositoryError;
use crate::models::otp::OtpChallenge;

/// Repository for OTP challenge operations.
pub struct OtpChallengeRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OtpChallengeRepository<'a> {
    /// Create a new OTP challenge repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert a fresh challenge for a phone, replacing any prior one.
    ///
    /// Resets the attempt counter and expiry in the same statement.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn replace(
        &self,
        phone: &Phone,
        code_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            INSERT INTO otp_challenges (phone, code_hash, expires_at, attempts, created_at)
            VALUES ($1, $2, $3, 0, now())
            ON CONFLICT (phone) DO UPDATE
            SET code_hash = EXCLUDED.code_hash,
                expires_at = EXCLUDED.expires_at,
                attempts = 0,
                created_at = now()
            ",
        )
        .bind(phone)
        .bind(code_hash)
        .bind(expires_at)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Get the live challenge for a phone, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn find(&self, phone: &Phone) -> Result<Option<OtpChallenge>, RepositoryError> {
        let challenge = sqlx::query_as::<_, OtpChallenge>(
            r"
            SELECT phone, code_hash, expires_at, attempts, created_at
            FROM otp_challenges
            WHERE phone = $1
            ",
        )
        .bind(phone)
        .fetch_optional(self.pool)
        .await?;

        Ok(challenge)
    }

    /// Atomically increment the attempt counter after a failed verify.
    ///
    /// Returns the counter value after the increment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the challenge vanished
    /// (e.g. a concurrent send replaced it and a delete raced this call).
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn record_failed_attempt(&self, phone: &Phone) -> Result<i32, RepositoryError> {
        let attempts = sqlx::query_scalar::<_, i32>(
            r"
            UPDATE otp_challenges
            SET attempts = attempts + 1
            WHERE phone = $1
            RETURNING attempts
            ",
        )
        .bind(phone)
        .fetch_optional(self.pool)
        .await?;

        attempts.ok_or(RepositoryError::NotFound)
    }

    /// Delete the challenge for a phone.
    ///
    /// # Returns
    ///
    /// Returns `true` if a challenge was deleted, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, phone: &Phone) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM otp_challenges WHERE phone = $1")
            .bind(phone)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Delete all expired challenges (hygiene sweep).
    ///
    /// Expiry is otherwise enforced lazily on read; this only reclaims
    /// rows for phones that never came back to verify.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_expired(&self) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM otp_challenges WHERE expires_at < now()")
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected())
    }
}
