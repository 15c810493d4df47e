//! User model.

use chrono::{DateTime, Utc};
use serde::Serialize;

use marigold_core::{Phone, UserId};

/// A storefront customer, keyed by phone number.
///
/// Created on first successful OTP verification; there is no separate
/// registration step.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub phone: Phone,
    pub created_at: DateTime<Utc>,
    pub last_login_at: DateTime<Utc>,
}
