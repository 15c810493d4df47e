//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Liveness check
//! GET  /health/ready               - Readiness check (database)
//!
//! # Catalog
//! GET  /products                   - Paged product listing
//! GET  /products/{slug}            - Product detail by slug
//!
//! # Cart
//! POST /cart/totals                - Totals preview for client-held cart state
//!
//! # Auth (OTP login)
//! POST /auth/otp/send              - Send a verification code
//! POST /auth/otp/verify            - Verify the code, establish session
//! GET  /auth/me                    - Current session identity
//! POST /auth/logout                - Clear the session
//!
//! # Account (requires session)
//! GET  /account/orders             - Order history
//! GET  /account/orders/{id}        - One order with lines
//!
//! # Checkout (requires session)
//! POST /orders                     - Create order from cart lines
//!
//! # Admin (requires x-admin-token)
//! POST   /admin/products           - Create product
//! PUT    /admin/products/{id}      - Update product
//! DELETE /admin/products/{id}      - Delete product
//! GET    /admin/orders             - All orders
//! PUT    /admin/orders/{id}/status - Update fulfillment status
//! ```

pub mod admin;
pub mod auth;
pub mod cart;
pub mod orders;
pub mod products;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::middleware::{api_rate_limiter, auth_rate_limiter};
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/otp/send", post(auth::send_otp))
        .route("/otp/verify", post(auth::verify_otp))
        .route("/me", get(auth::me))
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{slug}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new().route("/totals", post(cart::totals))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/orders", get(orders::account_orders))
        .route("/orders/{id}", get(orders::account_order_detail))
}

/// Create the admin routes router.
pub fn admin_routes() -> Router<AppState> {
    use axum::routing::delete;

    Router::new()
        .route("/products", post(admin::create_product))
        .route(
            "/products/{id}",
            put(admin::update_product).delete(admin::delete_product),
        )
        .route("/orders", get(admin::list_orders))
        .route("/orders/{id}/status", put(admin::update_order_status))
        .route("/otp-challenges/expired", delete(admin::sweep_expired_otp))
}

/// Create all routes for the storefront.
///
/// The auth group sits behind the strict per-IP limiter, everything else
/// behind the relaxed one.
pub fn routes() -> Router<AppState> {
    Router::new()
        .nest("/products", product_routes())
        .nest("/cart", cart_routes())
        .route("/orders", post(orders::create_order))
        .nest("/account", account_routes())
        .nest("/admin", admin_routes())
        .layer(api_rate_limiter())
        .nest("/auth", auth_routes().layer(auth_rate_limiter()))
}
