//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;
use url::Url;

use crate::config::StorefrontConfig;
use crate::services::catalog::CatalogService;
use crate::services::orders::OrderService;
use crate::services::otp::{OtpService, PgChallengeStore};
use crate::services::sms::{Msg91Client, SmsDispatcher, SmsError};

/// Error building application state.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid base_url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
    #[error("sms client error: {0}")]
    Sms(#[from] SmsError),
}

/// The OTP service as wired in production.
pub type AppOtpService = OtpService<PgChallengeStore, SmsDispatcher>;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and the services.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: CatalogService,
    orders: OrderService,
    otp: AppOtpService,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL is invalid or the SMS client
    /// cannot be constructed.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        // The public URL must at least parse; cookie security keys off it
        let _ = Url::parse(&config.base_url)?;

        let dispatcher = match &config.sms {
            Some(sms_config) => SmsDispatcher::Msg91(Msg91Client::new(sms_config)?),
            None => SmsDispatcher::Disabled,
        };

        let catalog = CatalogService::new(pool.clone());
        let orders = OrderService::new(pool.clone(), config.pricing.rules());
        let otp = OtpService::new(
            PgChallengeStore::new(pool.clone()),
            dispatcher,
            config.otp.clone(),
        );

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
                orders,
                otp,
            }),
        })
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the catalog service.
    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    /// Get a reference to the order service.
    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    /// Get a reference to the OTP login service.
    #[must_use]
    pub fn otp(&self) -> &AppOtpService {
        &self.inner.otp
    }
}
