//! Authentication extractors.
//!
//! `AuthSession` gates customer routes on the session established by OTP
//! verification. `RequireAdmin` gates the admin route group on the shared
//! admin token header - deliberately the thinnest possible contract, since
//! a full admin identity system is outside this service's scope.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use secrecy::ExposeSecret;
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::session::{CurrentUser, session_keys};
use crate::state::AppState;

/// Header carrying the admin shared secret.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

/// Extractor for the logged-in customer.
///
/// Rejects with 401 when the session has no verified identity.
pub struct AuthSession {
    pub user: CurrentUser,
    pub session: Session,
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state)
            .await
            .map_err(|(_, msg)| AppError::Internal(format!("session unavailable: {msg}")))?;

        let user: Option<CurrentUser> = session.get(session_keys::CURRENT_USER).await?;

        user.map(|user| Self { user, session })
            .ok_or_else(|| AppError::Unauthorized("login required".to_owned()))
    }
}

/// Extractor guarding admin routes.
pub struct RequireAdmin;

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let presented = parts
            .headers
            .get(ADMIN_TOKEN_HEADER)
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("admin token required".to_owned()))?;

        let expected = state.config().admin_token.expose_secret();
        if presented != expected {
            return Err(AppError::Unauthorized("invalid admin token".to_owned()));
        }

        Ok(Self)
    }
}
