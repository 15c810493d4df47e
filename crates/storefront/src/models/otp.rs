//! OTP challenge model.

use chrono::{DateTime, Utc};

use marigold_core::Phone;

/// One outstanding verification attempt for a phone number.
///
/// At most one challenge is live per phone (the table keys on the
/// normalized number and sends upsert). The plaintext code never reaches
/// this type; only its digest is stored or compared.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct OtpChallenge {
    pub phone: Phone,
    /// Base64-encoded SHA-256 digest of the code.
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    /// Failed verify count; the challenge dies when this reaches the
    /// configured maximum.
    pub attempts: i32,
    pub created_at: DateTime<Utc>,
}

impl OtpChallenge {
    /// Whether the challenge has passed its expiry timestamp.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
