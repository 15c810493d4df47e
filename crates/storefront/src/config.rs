//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MARIGOLD_DATABASE_URL` - `PostgreSQL` connection string
//! - `MARIGOLD_BASE_URL` - Public URL for the storefront API
//! - `MARIGOLD_SESSION_SECRET` - Session signing secret (min 32 chars, high entropy)
//! - `MARIGOLD_ADMIN_TOKEN` - Shared secret for the admin route group
//! - `MSG91_AUTH_KEY` - SMS provider auth key (not required in OTP bypass mode)
//! - `MSG91_TEMPLATE_ID` - SMS provider OTP template (not required in bypass mode)
//!
//! ## Optional
//! - `MARIGOLD_ENV` - Deployment environment (default: development)
//! - `MARIGOLD_HOST` - Bind address (default: 127.0.0.1)
//! - `MARIGOLD_PORT` - Listen port (default: 3000)
//! - `MARIGOLD_OTP_CODE_LENGTH` - OTP digits, 4-8 (default: 6)
//! - `MARIGOLD_OTP_TTL_SECS` - Challenge lifetime (default: 300)
//! - `MARIGOLD_OTP_MAX_ATTEMPTS` - Failed verifies before death (default: 5)
//! - `MARIGOLD_OTP_SEND_LIMIT` - Sends per phone per window (default: 3)
//! - `MARIGOLD_OTP_SEND_WINDOW_SECS` - Send quota window (default: 900)
//! - `MARIGOLD_OTP_SWEEP_INTERVAL_SECS` - Expired-challenge sweep, 0 = off (default: 0)
//! - `MARIGOLD_OTP_BYPASS` - Accept a fixed test code instead of sending SMS
//!   (default: false; refused when `MARIGOLD_ENV=production`)
//! - `MARIGOLD_OTP_BYPASS_CODE` - The fixed test code (required when bypass is on)
//! - `MSG91_SENDER_ID` - SMS sender id (default: MRGOLD)
//! - `MSG91_BASE_URL` - Provider base URL (default: <https://control.msg91.com>)
//! - `MARIGOLD_SMS_TIMEOUT_SECS` - Provider dispatch timeout (default: 15)
//! - `MARIGOLD_FREE_SHIPPING_THRESHOLD` - Subtotal for free shipping (default: 999)
//! - `MARIGOLD_SHIPPING_FEE` - Flat fee below the threshold (default: 60)
//! - `MARIGOLD_TAX_RATE` - Tax rate on the subtotal (default: 0.05)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use marigold_core::PricingRules;

const MIN_SESSION_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error("OTP bypass mode must not be enabled in production")]
    BypassInProduction,
}

/// Deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value {
            "production" | "prod" => Self::Production,
            _ => Self::Development,
        }
    }

    /// Name used for Sentry environment tagging.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// Deployment environment
    pub environment: Environment,
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront API
    pub base_url: String,
    /// Session signing secret
    pub session_secret: SecretString,
    /// Shared secret required by admin routes
    pub admin_token: SecretString,
    /// OTP login flow configuration
    pub otp: OtpConfig,
    /// SMS provider configuration; `None` in OTP bypass mode
    pub sms: Option<SmsConfig>,
    /// Cart/order pricing configuration
    pub pricing: PricingConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// OTP login flow configuration.
///
/// Explicit values handed to the OTP service at construction; nothing in
/// the flow reads the environment directly, so the whole state machine is
/// testable with short TTLs and tiny quotas.
#[derive(Debug, Clone)]
pub struct OtpConfig {
    /// Number of digits in a generated code (4-8).
    pub code_length: u32,
    /// Challenge lifetime in seconds. May be non-positive in tests to
    /// produce an already-expired challenge.
    pub ttl_secs: i64,
    /// Failed verifies before the challenge is destroyed.
    pub max_attempts: i32,
    /// Sends allowed per phone within one window.
    pub send_limit: NonZeroU32,
    /// Length of the send-quota window in seconds.
    pub send_window_secs: u64,
    /// Interval for the expired-challenge sweep task; 0 disables it.
    pub sweep_interval_secs: u64,
    /// Accept a fixed pre-shared code and skip SMS dispatch entirely.
    /// Opt-in for non-production testing only.
    pub bypass: bool,
    /// The fixed code accepted in bypass mode.
    pub bypass_code: Option<String>,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            ttl_secs: 300,
            max_attempts: 5,
            send_limit: NonZeroU32::new(3).unwrap_or(NonZeroU32::MIN),
            send_window_secs: 900,
            sweep_interval_secs: 0,
            bypass: false,
            bypass_code: None,
        }
    }
}

/// SMS provider (MSG91) configuration.
///
/// Implements `Debug` manually to redact the auth key.
#[derive(Clone)]
pub struct SmsConfig {
    /// Provider auth key.
    pub auth_key: SecretString,
    /// OTP flow/template id registered with the provider.
    pub template_id: String,
    /// Six-character sender id shown on the handset.
    pub sender_id: String,
    /// Provider API base URL.
    pub base_url: String,
    /// Outbound dispatch timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for SmsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmsConfig")
            .field("auth_key", &"[REDACTED]")
            .field("template_id", &self.template_id)
            .field("sender_id", &self.sender_id)
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Cart/order pricing configuration.
#[derive(Debug, Clone)]
pub struct PricingConfig {
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_fee: Decimal,
    pub tax_rate: Decimal,
}

impl PricingConfig {
    /// The pure pricing rules handed to `compute_totals`.
    #[must_use]
    pub const fn rules(&self) -> PricingRules {
        PricingRules {
            free_shipping_threshold: self.free_shipping_threshold,
            flat_shipping_fee: self.flat_shipping_fee,
            tax_rate: self.tax_rate,
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        let defaults = PricingRules::default();
        Self {
            free_shipping_threshold: defaults.free_shipping_threshold,
            flat_shipping_fee: defaults.flat_shipping_fee,
            tax_rate: defaults.tax_rate,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid,
    /// if secrets fail validation (placeholder detection, entropy check),
    /// or if OTP bypass is requested in a production environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let environment = Environment::parse(&get_env_or_default("MARIGOLD_ENV", "development"));
        let database_url = get_database_url("MARIGOLD_DATABASE_URL")?;
        let host = get_env_or_default("MARIGOLD_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("MARIGOLD_HOST".to_owned(), e.to_string()))?;
        let port = parse_env_or_default("MARIGOLD_PORT", 3000_u16)?;
        let base_url = get_required_env("MARIGOLD_BASE_URL")?;
        let session_secret = get_validated_secret("MARIGOLD_SESSION_SECRET")?;
        validate_session_secret(&session_secret, "MARIGOLD_SESSION_SECRET")?;
        let admin_token = get_validated_secret("MARIGOLD_ADMIN_TOKEN")?;

        let otp = OtpConfig::from_env(environment)?;
        let sms = if otp.bypass {
            None
        } else {
            Some(SmsConfig::from_env()?)
        };
        let pricing = PricingConfig::from_env()?;
        let sentry_dsn = get_optional_env("SENTRY_DSN");

        Ok(Self {
            environment,
            database_url,
            host,
            port,
            base_url,
            session_secret,
            admin_token,
            otp,
            sms,
            pricing,
            sentry_dsn,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl OtpConfig {
    fn from_env(environment: Environment) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let code_length = parse_env_or_default("MARIGOLD_OTP_CODE_LENGTH", defaults.code_length)?;
        if !(4..=8).contains(&code_length) {
            return Err(ConfigError::InvalidEnvVar(
                "MARIGOLD_OTP_CODE_LENGTH".to_owned(),
                format!("must be between 4 and 8, got {code_length}"),
            ));
        }

        let bypass = parse_env_or_default("MARIGOLD_OTP_BYPASS", false)?;
        if bypass && environment == Environment::Production {
            return Err(ConfigError::BypassInProduction);
        }

        let bypass_code = get_optional_env("MARIGOLD_OTP_BYPASS_CODE");
        if bypass && bypass_code.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "MARIGOLD_OTP_BYPASS_CODE".to_owned(),
            ));
        }

        let send_limit = parse_env_or_default("MARIGOLD_OTP_SEND_LIMIT", defaults.send_limit.get())?;
        let send_limit = NonZeroU32::new(send_limit).ok_or_else(|| {
            ConfigError::InvalidEnvVar(
                "MARIGOLD_OTP_SEND_LIMIT".to_owned(),
                "must be at least 1".to_owned(),
            )
        })?;

        Ok(Self {
            code_length,
            ttl_secs: parse_env_or_default("MARIGOLD_OTP_TTL_SECS", defaults.ttl_secs)?,
            max_attempts: parse_env_or_default("MARIGOLD_OTP_MAX_ATTEMPTS", defaults.max_attempts)?,
            send_limit,
            send_window_secs: parse_env_or_default(
                "MARIGOLD_OTP_SEND_WINDOW_SECS",
                defaults.send_window_secs,
            )?,
            sweep_interval_secs: parse_env_or_default(
                "MARIGOLD_OTP_SWEEP_INTERVAL_SECS",
                defaults.sweep_interval_secs,
            )?,
            bypass,
            bypass_code,
        })
    }
}

impl SmsConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            auth_key: get_validated_secret("MSG91_AUTH_KEY")?,
            template_id: get_required_env("MSG91_TEMPLATE_ID")?,
            sender_id: get_env_or_default("MSG91_SENDER_ID", "MRGOLD"),
            base_url: get_env_or_default("MSG91_BASE_URL", "https://control.msg91.com"),
            timeout_secs: parse_env_or_default("MARIGOLD_SMS_TIMEOUT_SECS", 15_u64)?.clamp(5, 30),
        })
    }
}

impl PricingConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            free_shipping_threshold: parse_env_or_default(
                "MARIGOLD_FREE_SHIPPING_THRESHOLD",
                defaults.free_shipping_threshold,
            )?,
            flat_shipping_fee: parse_env_or_default(
                "MARIGOLD_SHIPPING_FEE",
                defaults.flat_shipping_fee,
            )?,
            tax_rate: parse_env_or_default("MARIGOLD_TAX_RATE", defaults.tax_rate)?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_owned()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_owned()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

/// Parse an environment variable, falling back to a default when unset.
fn parse_env_or_default<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidEnvVar(key.to_owned(), e.to_string())),
        Err(_) => Ok(default),
    }
}

/// Validate that a session secret meets minimum length requirements.
fn validate_session_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_SESSION_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!(
                "must be at least {} characters (got {})",
                MIN_SESSION_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    // Check blocklist
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_owned(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Check entropy (real secrets like API keys have high entropy)
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_owned(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_parse() {
        assert_eq!(Environment::parse("production"), Environment::Production);
        assert_eq!(Environment::parse("prod"), Environment::Production);
        assert_eq!(Environment::parse("development"), Environment::Development);
        assert_eq!(Environment::parse("staging"), Environment::Development);
    }

    #[test]
    fn test_shannon_entropy_extremes() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
        assert!(shannon_entropy("aB3$xY9!mK2@nL5#") > 3.3);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        assert!(validate_secret_strength("your-api-key-here", "TEST_VAR").is_err());
        assert!(validate_secret_strength("changeme123", "TEST_VAR").is_err());
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InsecureSecret(_, _)
        ));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        assert!(validate_secret_strength("aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6", "TEST_VAR").is_ok());
    }

    #[test]
    fn test_validate_session_secret_length() {
        assert!(validate_session_secret(&SecretString::from("short"), "TEST").is_err());
        assert!(validate_session_secret(&SecretString::from("a".repeat(32)), "TEST").is_ok());
    }

    #[test]
    fn test_otp_defaults() {
        let otp = OtpConfig::default();
        assert_eq!(otp.code_length, 6);
        assert_eq!(otp.ttl_secs, 300);
        assert_eq!(otp.max_attempts, 5);
        assert_eq!(otp.send_limit.get(), 3);
        assert!(!otp.bypass);
    }

    #[test]
    fn test_pricing_defaults_match_rules() {
        let pricing = PricingConfig::default();
        let rules = pricing.rules();
        assert_eq!(rules.free_shipping_threshold, Decimal::new(999, 0));
        assert_eq!(rules.flat_shipping_fee, Decimal::new(60, 0));
        assert_eq!(rules.tax_rate, Decimal::new(5, 2));
    }

    #[test]
    fn test_sms_config_debug_redacts_auth_key() {
        let config = SmsConfig {
            auth_key: SecretString::from("super_secret_auth_key"),
            template_id: "tmpl-123".to_owned(),
            sender_id: "MRGOLD".to_owned(),
            base_url: "https://control.msg91.com".to_owned(),
            timeout_secs: 15,
        };

        let debug_output = format!("{config:?}");
        assert!(debug_output.contains("[REDACTED]"));
        assert!(debug_output.contains("tmpl-123"));
        assert!(!debug_output.contains("super_secret_auth_key"));
    }
}
