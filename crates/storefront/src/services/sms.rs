//! SMS dispatch for OTP codes.
//!
//! The provider is a black box behind [`SmsSender`]; anything that can
//! deliver a code to a handset is interchangeable. The production
//! implementation targets MSG91 and tries a small, fixed number of payload
//! shapes (the provider's flow API and its older OTP API) before
//! surfacing failure - never an unbounded retry loop.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use thiserror::Error;

use marigold_core::Phone;

use crate::config::SmsConfig;

/// Errors from SMS dispatch.
#[derive(Debug, Error)]
pub enum SmsError {
    /// Transport-level failure (connect, timeout, TLS).
    #[error("sms request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider accepted the request but rejected the dispatch.
    #[error("sms provider rejected dispatch: {0}")]
    Provider(String),

    /// No sender is configured (bypass-mode deployments never dispatch).
    #[error("sms dispatch is not configured")]
    NotConfigured,
}

/// Outbound code dispatch.
pub trait SmsSender {
    /// Deliver `code` to `phone`.
    fn send_code(
        &self,
        phone: &Phone,
        code: &str,
    ) -> impl Future<Output = Result<(), SmsError>> + Send;
}

/// MSG91 client.
pub struct Msg91Client {
    http: reqwest::Client,
    auth_key: SecretString,
    template_id: String,
    sender_id: String,
    base_url: String,
}

impl Msg91Client {
    /// Build a client from provider configuration.
    ///
    /// The HTTP client carries the configured dispatch timeout so a slow
    /// provider cannot hang a login request.
    ///
    /// # Errors
    ///
    /// Returns `SmsError::Http` if the HTTP client cannot be constructed.
    pub fn new(config: &SmsConfig) -> Result<Self, SmsError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            auth_key: config.auth_key.clone(),
            template_id: config.template_id.clone(),
            sender_id: config.sender_id.clone(),
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Flow API payload (current provider surface).
    async fn send_via_flow(&self, phone: &Phone, code: &str) -> Result<(), SmsError> {
        let body = json!({
            "template_id": self.template_id,
            "sender": self.sender_id,
            "short_url": "0",
            "recipients": [{
                "mobiles": format!("91{}", phone.as_str()),
                "otp": code,
            }],
        });

        let response = self
            .http
            .post(format!("{}/api/v5/flow", self.base_url))
            .header("authkey", self.auth_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        Self::check_provider_response(response).await
    }

    /// Legacy OTP API payload, kept as the fallback shape.
    async fn send_via_otp_api(&self, phone: &Phone, code: &str) -> Result<(), SmsError> {
        let response = self
            .http
            .post(format!("{}/api/v5/otp", self.base_url))
            .header("authkey", self.auth_key.expose_secret())
            .query(&[
                ("template_id", self.template_id.as_str()),
                ("mobile", &format!("91{}", phone.as_str())),
                ("otp", code),
            ])
            .send()
            .await?;

        Self::check_provider_response(response).await
    }

    async fn check_provider_response(response: reqwest::Response) -> Result<(), SmsError> {
        let status = response.status();
        let payload: serde_json::Value = response.json().await.unwrap_or_default();

        // MSG91 reports errors with 200s; the body's "type" field decides.
        let kind = payload
            .get("type")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();

        if status.is_success() && kind.eq_ignore_ascii_case("success") {
            return Ok(());
        }

        let message = payload
            .get("message")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown provider error");
        Err(SmsError::Provider(format!("{status}: {message}")))
    }
}

impl SmsSender for Msg91Client {
    async fn send_code(&self, phone: &Phone, code: &str) -> Result<(), SmsError> {
        match self.send_via_flow(phone, code).await {
            Ok(()) => Ok(()),
            Err(flow_err) => {
                tracing::warn!(error = %flow_err, "flow dispatch failed, trying otp api");
                self.send_via_otp_api(phone, code).await
            }
        }
    }
}

/// The sender wired into application state.
///
/// Bypass-mode deployments carry `Disabled`; the OTP service never calls
/// the sender in bypass mode, so reaching it is a configuration bug and
/// reports as such rather than silently succeeding.
pub enum SmsDispatcher {
    Msg91(Msg91Client),
    Disabled,
}

impl SmsSender for SmsDispatcher {
    async fn send_code(&self, phone: &Phone, code: &str) -> Result<(), SmsError> {
        match self {
            Self::Msg91(client) => client.send_code(phone, code).await,
            Self::Disabled => Err(SmsError::NotConfigured),
        }
    }
}
