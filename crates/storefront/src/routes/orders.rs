//! Checkout and account order route handlers.

use axum::Json;
use axum::extract::{Path, State};
use tracing::instrument;

use marigold_core::OrderId;

use crate::error::Result;
use crate::middleware::AuthSession;
use crate::models::order::{Order, OrderWithItems};
use crate::services::orders::CheckoutRequest;
use crate::state::AppState;

/// `POST /orders` - create an order from the submitted cart lines.
///
/// Totals in the payload, if any, are ignored; the order service
/// recomputes them from the lines.
#[instrument(skip(state, auth, request))]
pub async fn create_order(
    State(state): State<AppState>,
    auth: AuthSession,
    Json(request): Json<CheckoutRequest>,
) -> Result<Json<OrderWithItems>> {
    let order = state.orders().create(auth.user.id, request).await?;
    Ok(Json(order))
}

/// `GET /account/orders` - the logged-in user's order history.
#[instrument(skip(state, auth))]
pub async fn account_orders(
    State(state): State<AppState>,
    auth: AuthSession,
) -> Result<Json<Vec<Order>>> {
    let orders = state.orders().list_for_user(auth.user.id).await?;
    Ok(Json(orders))
}

/// `GET /account/orders/{id}` - one order with its lines.
#[instrument(skip(state, auth))]
pub async fn account_order_detail(
    State(state): State<AppState>,
    auth: AuthSession,
    Path(id): Path<i64>,
) -> Result<Json<OrderWithItems>> {
    let order = state
        .orders()
        .get_for_user(auth.user.id, OrderId::new(id))
        .await?;
    Ok(Json(order))
}
