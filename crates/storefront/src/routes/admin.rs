//! Admin route handlers.
//!
//! Product writes here are the consumers of the slug pipeline: payloads go
//! through the catalog service, which slugifies, resolves uniqueness, and
//! handles the insert-conflict retry. Every handler takes `RequireAdmin`.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;

use marigold_core::{OrderId, ProductId};

use crate::db::OtpChallengeRepository;
use crate::error::Result;
use crate::middleware::RequireAdmin;
use crate::models::order::Order;
use crate::models::product::Product;
use crate::services::catalog::ProductInput;
use crate::state::AppState;

/// `POST /admin/products` - create a product.
#[instrument(skip(state, _admin, input))]
pub async fn create_product(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let product = state.catalog().create(input).await?;
    tracing::info!(product_id = %product.id, slug = %product.slug, "product created");
    Ok(Json(product))
}

/// `PUT /admin/products/{id}` - update a product.
#[instrument(skip(state, _admin, input))]
pub async fn update_product(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i64>,
    Json(input): Json<ProductInput>,
) -> Result<Json<Product>> {
    let product = state.catalog().update(ProductId::new(id), input).await?;
    Ok(Json(product))
}

/// `DELETE /admin/products/{id}` - delete a product.
#[instrument(skip(state, _admin))]
pub async fn delete_product(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i64>,
) -> Result<Json<serde_json::Value>> {
    state.catalog().delete(ProductId::new(id)).await?;
    Ok(Json(json!({ "ok": true })))
}

/// Paging query for the admin order listing.
#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub per_page: Option<i64>,
}

/// `GET /admin/orders` - all orders, newest first.
#[instrument(skip(state, _admin))]
pub async fn list_orders(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Query(query): Query<OrderListQuery>,
) -> Result<Json<Vec<Order>>> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(50).clamp(1, 200);
    let offset = (page - 1).saturating_mul(per_page);

    let orders = state.orders().list_all(per_page, offset).await?;
    Ok(Json(orders))
}

/// Status update payload.
#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

/// `PUT /admin/orders/{id}/status` - update fulfillment status.
#[instrument(skip(state, _admin))]
pub async fn update_order_status(
    State(state): State<AppState>,
    _admin: RequireAdmin,
    Path(id): Path<i64>,
    Json(update): Json<StatusUpdate>,
) -> Result<Json<serde_json::Value>> {
    state
        .orders()
        .update_status(OrderId::new(id), &update.status)
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// `DELETE /admin/otp-challenges/expired` - manual hygiene sweep.
///
/// Expiry is enforced lazily on verify; this reclaims rows for phones
/// that never came back. The same sweep runs periodically when
/// `MARIGOLD_OTP_SWEEP_INTERVAL_SECS` is set.
#[instrument(skip(state, _admin))]
pub async fn sweep_expired_otp(
    State(state): State<AppState>,
    _admin: RequireAdmin,
) -> Result<Json<serde_json::Value>> {
    let removed = OtpChallengeRepository::new(state.pool())
        .delete_expired()
        .await?;
    Ok(Json(json!({ "ok": true, "removed": removed })))
}
