//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures server errors to Sentry
//! before responding to the client. All route handlers return
//! `Result<T, AppError>`. The response body is JSON (`{"error": "..."}`)
//! since the consumer is a browser SPA.

use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::catalog::CatalogError;
use crate::services::orders::OrderError;
use crate::services::otp::OtpError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// Catalog operation failed.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// Order operation failed.
    #[error("Order error: {0}")]
    Order(#[from] OrderError),

    /// OTP flow operation failed.
    #[error("OTP error: {0}")]
    Otp(#[from] OtpError),

    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Whether this error is a server fault worth capturing.
    fn is_server_fault(&self) -> bool {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => true,
            Self::Catalog(CatalogError::Repository(_) | CatalogError::SlugConflict)
            | Self::Order(OrderError::Repository(_))
            | Self::Otp(OtpError::Repository(_) | OtpError::Dispatch(_)) => true,
            _ => false,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            Self::Catalog(err) => match err {
                CatalogError::NotFound => StatusCode::NOT_FOUND,
                CatalogError::SlugConflict => StatusCode::CONFLICT,
                CatalogError::Invalid(_) => StatusCode::BAD_REQUEST,
                CatalogError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Order(err) => match err {
                OrderError::EmptyCart | OrderError::InvalidStatus(_) => StatusCode::BAD_REQUEST,
                OrderError::NotFound => StatusCode::NOT_FOUND,
                OrderError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Otp(err) => match err {
                OtpError::InvalidPhone(_)
                | OtpError::MissingCode
                | OtpError::MalformedCode
                | OtpError::NoPending
                | OtpError::Expired
                | OtpError::TooManyAttempts
                | OtpError::InvalidCode => StatusCode::BAD_REQUEST,
                OtpError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
                OtpError::Dispatch(_) => StatusCode::BAD_GATEWAY,
                OtpError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-safe message; internals never leak.
    fn public_message(&self) -> String {
        match self {
            Self::Database(_) | Self::Session(_) | Self::Internal(_) => {
                "Internal server error".to_owned()
            }
            Self::Catalog(CatalogError::Repository(_))
            | Self::Order(OrderError::Repository(_))
            | Self::Otp(OtpError::Repository(_)) => "Internal server error".to_owned(),
            Self::Otp(OtpError::Dispatch(_)) => {
                "Could not send the verification code, try again shortly".to_owned()
            }
            Self::Catalog(err) => err.to_string(),
            Self::Order(err) => err.to_string(),
            Self::Otp(err) => err.to_string(),
            Self::NotFound(msg) | Self::Unauthorized(msg) | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if self.is_server_fault() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        let status = self.status();
        let body = Json(json!({ "error": self.public_message() }));

        // Rate-limited responses carry a machine-readable retry hint
        if let Self::Otp(OtpError::RateLimited { retry_after }) = &self {
            let retry_secs = retry_after.as_secs().max(1);
            let headers = [(header::RETRY_AFTER, HeaderValue::from(retry_secs))];
            return (status, headers, body).into_response();
        }

        (status, body).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("x".to_owned())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("x".to_owned())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("x".to_owned())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Otp(OtpError::InvalidCode)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Catalog(CatalogError::SlugConflict)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Order(OrderError::EmptyCart)),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_rate_limited_carries_retry_after() {
        let err = AppError::Otp(OtpError::RateLimited {
            retry_after: std::time::Duration::from_secs(42),
        });
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok()),
            Some("42")
        );
    }

    #[test]
    fn test_internal_details_do_not_leak() {
        let err = AppError::Internal("connection pool exploded at 10.0.0.3".to_owned());
        assert_eq!(err.public_message(), "Internal server error");
    }
}
