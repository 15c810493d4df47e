//! OTP flow error types.

use std::time::Duration;

use thiserror::Error;

use marigold_core::PhoneError;

use crate::db::RepositoryError;
use crate::services::sms::SmsError;

/// Errors that can occur during the OTP send/verify flow.
///
/// Expired/exhausted/invalid-code outcomes are expected user-facing
/// results, not system faults; they map to 4xx responses. None of the
/// variants ever carry the plaintext code.
#[derive(Debug, Error)]
pub enum OtpError {
    /// The phone number did not normalize to a valid mobile number.
    #[error("invalid phone number: {0}")]
    InvalidPhone(#[from] PhoneError),

    /// No verification code was submitted.
    #[error("verification code is required")]
    MissingCode,

    /// The submitted code has the wrong shape (non-digits, wrong length).
    #[error("verification code must be numeric")]
    MalformedCode,

    /// Send quota for this phone is exhausted.
    #[error("too many code requests, retry after {} seconds", retry_after.as_secs())]
    RateLimited {
        /// How long the caller should wait before the next send.
        retry_after: Duration,
    },

    /// No live challenge exists for this phone.
    #[error("no pending verification for this number")]
    NoPending,

    /// The challenge passed its expiry before a successful verify.
    #[error("verification code expired, request a new one")]
    Expired,

    /// The challenge ran out of attempts.
    #[error("too many incorrect attempts, request a new code")]
    TooManyAttempts,

    /// The submitted code did not match. Deliberately says nothing about
    /// remaining attempts.
    #[error("incorrect verification code")]
    InvalidCode,

    /// The SMS provider could not deliver the code.
    #[error("failed to send verification code: {0}")]
    Dispatch(#[from] SmsError),

    /// Challenge store failure.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
