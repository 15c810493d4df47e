//! OTP login flow.
//!
//! A small state machine per phone number: `send` creates a `PENDING`
//! challenge (hashed code, expiry, attempt counter), `verify` consumes it.
//! Terminal outcomes (verified, expired, exhausted) all delete the
//! challenge; a fresh `send` always starts over. At most one challenge is
//! live per phone - the store's upsert replaces any predecessor.
//!
//! The plaintext code exists only on the wire to the SMS provider (or in
//! the send response in bypass mode); storage and comparison use a SHA-256
//! digest.

mod error;

pub use error::OtpError;

use chrono::Utc;
use governor::clock::{Clock, DefaultClock};
use governor::state::keyed::DashMapStateStore;
use governor::{Quota, RateLimiter};
use rand::Rng;
use sqlx::PgPool;
use std::num::NonZeroU32;
use std::time::Duration;

use marigold_core::Phone;

use crate::config::OtpConfig;
use crate::db::{OtpChallengeRepository, RepositoryError};
use crate::models::otp::OtpChallenge;
use crate::services::sms::SmsSender;

/// Persistence seam for challenges.
///
/// The production implementation is [`PgChallengeStore`]; tests use an
/// in-memory map. Contract per operation:
/// - `replace` atomically supersedes any prior challenge for the phone
/// - `record_failed_attempt` is an atomic increment returning the new count
/// - `delete` is idempotent
pub trait ChallengeStore {
    fn replace(
        &self,
        challenge: &OtpChallenge,
    ) -> impl Future<Output = Result<(), RepositoryError>> + Send;

    fn find(
        &self,
        phone: &Phone,
    ) -> impl Future<Output = Result<Option<OtpChallenge>, RepositoryError>> + Send;

    fn record_failed_attempt(
        &self,
        phone: &Phone,
    ) -> impl Future<Output = Result<i32, RepositoryError>> + Send;

    fn delete(&self, phone: &Phone) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

/// Postgres-backed challenge store.
pub struct PgChallengeStore {
    pool: PgPool,
}

impl PgChallengeStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl ChallengeStore for PgChallengeStore {
    async fn replace(&self, challenge: &OtpChallenge) -> Result<(), RepositoryError> {
        OtpChallengeRepository::new(&self.pool)
            .replace(&challenge.phone, &challenge.code_hash, challenge.expires_at)
            .await
    }

    async fn find(&self, phone: &Phone) -> Result<Option<OtpChallenge>, RepositoryError> {
        OtpChallengeRepository::new(&self.pool).find(phone).await
    }

    async fn record_failed_attempt(&self, phone: &Phone) -> Result<i32, RepositoryError> {
        OtpChallengeRepository::new(&self.pool)
            .record_failed_attempt(phone)
            .await
    }

    async fn delete(&self, phone: &Phone) -> Result<bool, RepositoryError> {
        OtpChallengeRepository::new(&self.pool).delete(phone).await
    }
}

/// Outcome of a successful `send`.
#[derive(Debug, Clone)]
pub struct SendOutcome {
    /// The canonical phone the challenge was created for.
    pub phone: Phone,
    /// The fixed code, echoed back in bypass mode only so test clients
    /// can complete the flow without a handset. Always `None` when a real
    /// SMS was dispatched.
    pub bypass_code: Option<String>,
}

/// Outcome of a successful `verify`: the identity the caller may now
/// establish a session for.
#[derive(Debug, Clone)]
pub struct VerifiedPhone {
    pub phone: Phone,
}

type SendQuota = RateLimiter<String, DashMapStateStore<String>, DefaultClock>;

/// OTP login service.
pub struct OtpService<C, S> {
    store: C,
    sender: S,
    config: OtpConfig,
    send_quota: SendQuota,
    clock: DefaultClock,
}

impl<C: ChallengeStore, S: SmsSender> OtpService<C, S> {
    /// Create the service.
    ///
    /// The per-phone send quota lives here (keyed governor limiter); it is
    /// the one piece of shared mutable state in the flow and uses the
    /// limiter's atomic state cells rather than read-modify-write.
    #[must_use]
    pub fn new(store: C, sender: S, config: OtpConfig) -> Self {
        let clock = DefaultClock::default();
        let send_quota = build_send_quota(&config, &clock);
        Self {
            store,
            sender,
            config,
            send_quota,
            clock,
        }
    }

    /// Issue a fresh challenge for `raw_phone` and dispatch the code.
    ///
    /// The upsert completes before dispatch and before returning, so a
    /// client that sees success can immediately verify. A dispatch failure
    /// rolls the challenge back - no stored code the user never received.
    ///
    /// # Errors
    ///
    /// - `OtpError::InvalidPhone` for unparseable numbers
    /// - `OtpError::RateLimited` when the phone's send quota is exhausted
    /// - `OtpError::Dispatch` when the SMS provider fails
    /// - `OtpError::Repository` on store failures
    pub async fn send(&self, raw_phone: &str) -> Result<SendOutcome, OtpError> {
        let phone = Phone::parse(raw_phone)?;

        // Quota check first: a blocked phone must not generate or store
        // a new code.
        if let Err(not_until) = self.send_quota.check_key(&phone.as_str().to_owned()) {
            let retry_after = not_until.wait_time_from(self.clock.now());
            tracing::info!(phone = %phone, ?retry_after, "otp send quota exceeded");
            return Err(OtpError::RateLimited { retry_after });
        }

        let code = if self.config.bypass {
            self.config
                .bypass_code
                .clone()
                .ok_or(OtpError::Repository(RepositoryError::DataCorruption(
                    "bypass mode without bypass code".to_owned(),
                )))?
        } else {
            generate_code(self.config.code_length)
        };

        let challenge = OtpChallenge {
            phone: phone.clone(),
            code_hash: hash_code(&code),
            expires_at: Utc::now() + chrono::Duration::seconds(self.config.ttl_secs),
            attempts: 0,
            created_at: Utc::now(),
        };
        self.store.replace(&challenge).await?;

        if self.config.bypass {
            tracing::info!(phone = %phone, "otp bypass mode: skipping sms dispatch");
            return Ok(SendOutcome {
                phone,
                bypass_code: Some(code),
            });
        }

        if let Err(dispatch_err) = self.sender.send_code(&phone, &code).await {
            // Roll back so no challenge exists for a code nobody received.
            if let Err(cleanup_err) = self.store.delete(&phone).await {
                tracing::error!(phone = %phone, error = %cleanup_err,
                    "failed to roll back challenge after dispatch failure");
            }
            return Err(OtpError::Dispatch(dispatch_err));
        }

        tracing::info!(phone = %phone, "otp code dispatched");
        Ok(SendOutcome {
            phone,
            bypass_code: None,
        })
    }

    /// Verify a submitted code against the live challenge.
    ///
    /// Single-use: success deletes the challenge, so a replayed code finds
    /// nothing pending. Expiry and the attempt cap also delete it.
    ///
    /// # Errors
    ///
    /// - `OtpError::InvalidPhone` / `MissingCode` / `MalformedCode` for
    ///   validation failures (these never touch the challenge)
    /// - `OtpError::NoPending` when no challenge exists
    /// - `OtpError::Expired` / `TooManyAttempts` for dead challenges
    /// - `OtpError::InvalidCode` on mismatch
    /// - `OtpError::Repository` on store failures
    pub async fn verify(
        &self,
        raw_phone: &str,
        submitted_code: &str,
    ) -> Result<VerifiedPhone, OtpError> {
        let phone = Phone::parse(raw_phone)?;

        let submitted = submitted_code.trim();
        if submitted.is_empty() {
            return Err(OtpError::MissingCode);
        }
        if !submitted.chars().all(|c| c.is_ascii_digit()) {
            return Err(OtpError::MalformedCode);
        }

        let challenge = self
            .store
            .find(&phone)
            .await?
            .ok_or(OtpError::NoPending)?;

        if challenge.is_expired(Utc::now()) {
            self.store.delete(&phone).await?;
            return Err(OtpError::Expired);
        }

        if challenge.attempts >= self.config.max_attempts {
            // Stale over-limit row (e.g. a crashed earlier cleanup)
            self.store.delete(&phone).await?;
            return Err(OtpError::TooManyAttempts);
        }

        if hash_code(submitted) != challenge.code_hash {
            let attempts = self.store.record_failed_attempt(&phone).await?;
            if attempts >= self.config.max_attempts {
                self.store.delete(&phone).await?;
                tracing::info!(phone = %phone, attempts, "otp challenge exhausted");
                return Err(OtpError::TooManyAttempts);
            }
            tracing::debug!(phone = %phone, attempts, "otp code mismatch");
            return Err(OtpError::InvalidCode);
        }

        // Single use: consume on success.
        self.store.delete(&phone).await?;
        tracing::info!(phone = %phone, "otp verified");
        Ok(VerifiedPhone { phone })
    }
}

/// Build the keyed send limiter: `send_limit` sends per phone per window,
/// replenishing evenly across the window.
fn build_send_quota(config: &OtpConfig, clock: &DefaultClock) -> SendQuota {
    let replenish_secs = (config.send_window_secs / u64::from(config.send_limit.get())).max(1);
    let quota = Quota::with_period(Duration::from_secs(replenish_secs))
        .unwrap_or_else(|| Quota::per_minute(NonZeroU32::MIN))
        .allow_burst(config.send_limit);
    RateLimiter::dashmap_with_clock(quota, clock.clone())
}

/// Generate a zero-padded random numeric code.
fn generate_code(length: u32) -> String {
    let bound = 10_u32.saturating_pow(length);
    let value = rand::rng().random_range(0..bound);
    format!("{value:0width$}", width = length as usize)
}

/// One-way digest of a code: base64(SHA-256(code)).
fn hash_code(code: &str) -> String {
    use base64::Engine as _;
    use sha2::{Digest, Sha256};

    let digest = Sha256::digest(code.as_bytes());
    base64::engine::general_purpose::STANDARD.encode(digest)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::services::sms::SmsError;

    #[derive(Default)]
    struct MemoryStore {
        challenges: Mutex<HashMap<String, OtpChallenge>>,
    }

    impl ChallengeStore for MemoryStore {
        async fn replace(&self, challenge: &OtpChallenge) -> Result<(), RepositoryError> {
            self.challenges
                .lock()
                .unwrap()
                .insert(challenge.phone.as_str().to_owned(), challenge.clone());
            Ok(())
        }

        async fn find(&self, phone: &Phone) -> Result<Option<OtpChallenge>, RepositoryError> {
            Ok(self.challenges.lock().unwrap().get(phone.as_str()).cloned())
        }

        async fn record_failed_attempt(&self, phone: &Phone) -> Result<i32, RepositoryError> {
            let mut challenges = self.challenges.lock().unwrap();
            let challenge = challenges
                .get_mut(phone.as_str())
                .ok_or(RepositoryError::NotFound)?;
            challenge.attempts += 1;
            Ok(challenge.attempts)
        }

        async fn delete(&self, phone: &Phone) -> Result<bool, RepositoryError> {
            Ok(self
                .challenges
                .lock()
                .unwrap()
                .remove(phone.as_str())
                .is_some())
        }
    }

    /// Records dispatched codes; can be told to fail.
    #[derive(Default)]
    struct RecordingSender {
        sent: Mutex<Vec<(String, String)>>,
        fail: AtomicBool,
    }

    impl SmsSender for RecordingSender {
        async fn send_code(&self, phone: &Phone, code: &str) -> Result<(), SmsError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(SmsError::Provider("simulated outage".to_owned()));
            }
            self.sent
                .lock()
                .unwrap()
                .push((phone.as_str().to_owned(), code.to_owned()));
            Ok(())
        }
    }

    const PHONE: &str = "9876543210";

    fn test_config() -> OtpConfig {
        OtpConfig {
            send_limit: NonZeroU32::new(3).unwrap(),
            send_window_secs: 900,
            ..OtpConfig::default()
        }
    }

    fn service(config: OtpConfig) -> OtpService<MemoryStore, RecordingSender> {
        OtpService::new(MemoryStore::default(), RecordingSender::default(), config)
    }

    fn last_sent_code(service: &OtpService<MemoryStore, RecordingSender>) -> String {
        service
            .sender
            .sent
            .lock()
            .unwrap()
            .last()
            .map(|(_, code)| code.clone())
            .unwrap()
    }

    #[tokio::test]
    async fn test_send_then_verify_succeeds_once() {
        let service = service(test_config());

        service.send(PHONE).await.unwrap();
        let code = last_sent_code(&service);
        assert_eq!(code.len(), 6);

        let verified = service.verify(PHONE, &code).await.unwrap();
        assert_eq!(verified.phone.as_str(), PHONE);

        // Single use: the same code immediately after success finds nothing
        let replay = service.verify(PHONE, &code).await;
        assert!(matches!(replay, Err(OtpError::NoPending)));
    }

    #[tokio::test]
    async fn test_verify_without_send() {
        let service = service(test_config());
        let result = service.verify(PHONE, "123456").await;
        assert!(matches!(result, Err(OtpError::NoPending)));
    }

    #[tokio::test]
    async fn test_wrong_code_then_correct_code() {
        let service = service(test_config());
        service.send(PHONE).await.unwrap();
        let code = last_sent_code(&service);

        let wrong = if code == "000000" { "000001" } else { "000000" };
        assert!(matches!(
            service.verify(PHONE, wrong).await,
            Err(OtpError::InvalidCode)
        ));

        // A failed attempt does not consume the challenge
        assert!(service.verify(PHONE, &code).await.is_ok());
    }

    #[tokio::test]
    async fn test_attempt_limit_exhausts_challenge() {
        let config = test_config();
        let max = config.max_attempts;
        let service = service(config);

        service.send(PHONE).await.unwrap();
        let code = last_sent_code(&service);
        let wrong = if code == "000000" { "000001" } else { "000000" };

        // max - 1 plain mismatches...
        for _ in 0..(max - 1) {
            assert!(matches!(
                service.verify(PHONE, wrong).await,
                Err(OtpError::InvalidCode)
            ));
        }
        // ...the final one reports exhaustion and destroys the challenge
        assert!(matches!(
            service.verify(PHONE, wrong).await,
            Err(OtpError::TooManyAttempts)
        ));

        // Even the correct code now finds no challenge
        assert!(matches!(
            service.verify(PHONE, &code).await,
            Err(OtpError::NoPending)
        ));
    }

    #[tokio::test]
    async fn test_expired_challenge_is_deleted_on_verify() {
        let service = service(OtpConfig {
            ttl_secs: -1,
            ..test_config()
        });

        service.send(PHONE).await.unwrap();
        let code = last_sent_code(&service);

        assert!(matches!(
            service.verify(PHONE, &code).await,
            Err(OtpError::Expired)
        ));
        // Lazy deletion happened; next verify sees nothing pending
        assert!(matches!(
            service.verify(PHONE, &code).await,
            Err(OtpError::NoPending)
        ));
    }

    #[tokio::test]
    async fn test_resend_supersedes_prior_challenge() {
        let service = service(test_config());

        service.send(PHONE).await.unwrap();
        let first_code = last_sent_code(&service);

        service.send(PHONE).await.unwrap();
        let second_code = last_sent_code(&service);

        if first_code != second_code {
            // The superseded code no longer verifies
            assert!(matches!(
                service.verify(PHONE, &first_code).await,
                Err(OtpError::InvalidCode)
            ));
        }
        assert!(service.verify(PHONE, &second_code).await.is_ok());
    }

    #[tokio::test]
    async fn test_send_quota() {
        let service = service(test_config());

        for _ in 0..3 {
            service.send(PHONE).await.unwrap();
        }
        match service.send(PHONE).await {
            Err(OtpError::RateLimited { retry_after }) => {
                assert!(retry_after > Duration::ZERO);
            }
            other => panic!("expected rate limit, got {other:?}"),
        }

        // Another phone is unaffected
        assert!(service.send("9123456780").await.is_ok());
    }

    #[tokio::test]
    async fn test_dispatch_failure_rolls_back_challenge() {
        let service = service(test_config());
        service.sender.fail.store(true, Ordering::SeqCst);

        let result = service.send(PHONE).await;
        assert!(matches!(result, Err(OtpError::Dispatch(_))));

        // No orphaned challenge for a code nobody received
        service.sender.fail.store(false, Ordering::SeqCst);
        assert!(matches!(
            service.verify(PHONE, "123456").await,
            Err(OtpError::NoPending)
        ));
    }

    #[tokio::test]
    async fn test_bypass_mode_uses_fixed_code_without_dispatch() {
        let service = service(OtpConfig {
            bypass: true,
            bypass_code: Some("424242".to_owned()),
            ..test_config()
        });

        let outcome = service.send(PHONE).await.unwrap();
        assert_eq!(outcome.bypass_code.as_deref(), Some("424242"));
        // Nothing went out through the sender
        assert!(service.sender.sent.lock().unwrap().is_empty());

        assert!(service.verify(PHONE, "424242").await.is_ok());
    }

    #[tokio::test]
    async fn test_validation_errors_do_not_touch_challenge() {
        let service = service(test_config());
        service.send(PHONE).await.unwrap();
        let code = last_sent_code(&service);

        assert!(matches!(
            service.verify("12", &code).await,
            Err(OtpError::InvalidPhone(_))
        ));
        assert!(matches!(
            service.verify(PHONE, "   ").await,
            Err(OtpError::MissingCode)
        ));
        assert!(matches!(
            service.verify(PHONE, "12ab56").await,
            Err(OtpError::MalformedCode)
        ));

        // None of the above consumed an attempt or the challenge
        assert!(service.verify(PHONE, &code).await.is_ok());
    }

    #[test]
    fn test_generate_code_shape() {
        for length in 4..=8 {
            let code = generate_code(length);
            assert_eq!(code.len(), length as usize);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_hash_is_stable_and_opaque() {
        assert_eq!(hash_code("123456"), hash_code("123456"));
        assert_ne!(hash_code("123456"), hash_code("123457"));
        assert!(!hash_code("123456").contains("123456"));
    }
}
