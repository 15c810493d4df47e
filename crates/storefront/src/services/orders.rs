//! Order service: checkout and order management.
//!
//! The client ships its cart lines at checkout; this service recomputes
//! every total from those lines with the same pure function the cart
//! preview uses. Client-submitted total fields are never read, so the
//! number the customer saw and the number persisted cannot diverge unless
//! the lines themselves changed - in which case the recomputed value wins.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use marigold_core::{LineItem, OrderId, PricingRules, UserId, compute_totals};

use crate::db::orders::NewOrderItem;
use crate::db::{OrderRepository, RepositoryError};
use crate::models::order::{Order, OrderStatus, OrderWithItems, ShippingAddress};

/// Errors from order operations.
#[derive(Debug, Error)]
pub enum OrderError {
    /// No purchasable lines in the checkout payload.
    #[error("cart is empty")]
    EmptyCart,

    /// Order does not exist.
    #[error("order not found")]
    NotFound,

    /// Unknown status value in an admin update.
    #[error("{0}")]
    InvalidStatus(String),

    /// Database failure.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Checkout payload. Line items deserialize leniently (malformed price or
/// quantity collapses to zero); any totals a client tacks on are ignored
/// by serde and recomputed here.
#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    pub items: Vec<LineItem>,
    pub address: ShippingAddress,
}

/// Order service.
pub struct OrderService {
    pool: PgPool,
    pricing: PricingRules,
}

impl OrderService {
    /// Create the service with the shop's pricing rules.
    #[must_use]
    pub const fn new(pool: PgPool, pricing: PricingRules) -> Self {
        Self { pool, pricing }
    }

    /// The pricing rules in force (shared with the cart preview route).
    #[must_use]
    pub const fn pricing(&self) -> &PricingRules {
        &self.pricing
    }

    /// Create an order from a checkout payload.
    ///
    /// Totals are recomputed server-side; lines that contribute nothing
    /// (zero quantity or zero price after lenient parsing) are dropped
    /// before persistence.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::EmptyCart` when no purchasable lines remain,
    /// `OrderError::Repository` on database failure.
    pub async fn create(
        &self,
        user_id: UserId,
        request: CheckoutRequest,
    ) -> Result<OrderWithItems, OrderError> {
        let purchasable: Vec<LineItem> = request
            .items
            .into_iter()
            .filter(|item| !item.line_total().is_zero())
            .collect();

        if purchasable.is_empty() {
            return Err(OrderError::EmptyCart);
        }

        let totals = compute_totals(&purchasable, &self.pricing);

        let items: Vec<NewOrderItem> = purchasable
            .into_iter()
            .map(|item| NewOrderItem {
                product_id: item.product_id,
                title: if item.title.trim().is_empty() {
                    "item".to_owned()
                } else {
                    item.title.trim().to_owned()
                },
                price: item.price.max(Decimal::ZERO),
                quantity: i32::try_from(item.quantity.min(marigold_core::totals::MAX_LINE_QUANTITY))
                    .unwrap_or(1),
                color: item.color,
                size: item.size,
                image: item.image,
            })
            .collect();

        let order = OrderRepository::new(&self.pool)
            .create(user_id, &request.address, &items, &totals)
            .await?;

        tracing::info!(
            order_id = %order.order.id,
            user_id = %user_id,
            total = %order.order.total,
            "order created"
        );

        Ok(order)
    }

    /// A user's order history, newest first.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` on database failure.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, OrderError> {
        Ok(OrderRepository::new(&self.pool)
            .list_for_user(user_id)
            .await?)
    }

    /// One order with its lines, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::NotFound` when the order doesn't exist or
    /// belongs to someone else (indistinguishable by design).
    pub async fn get_for_user(
        &self,
        user_id: UserId,
        id: OrderId,
    ) -> Result<OrderWithItems, OrderError> {
        let order = OrderRepository::new(&self.pool)
            .get_with_items(id)
            .await?
            .filter(|o| o.order.user_id == user_id)
            .ok_or(OrderError::NotFound)?;
        Ok(order)
    }

    /// All orders, newest first (admin view).
    ///
    /// # Errors
    ///
    /// Returns `OrderError::Repository` on database failure.
    pub async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<Order>, OrderError> {
        Ok(OrderRepository::new(&self.pool)
            .list_all(limit, offset)
            .await?)
    }

    /// Admin status update.
    ///
    /// # Errors
    ///
    /// Returns `OrderError::InvalidStatus` for unknown status values,
    /// `OrderError::NotFound` for unknown orders.
    pub async fn update_status(&self, id: OrderId, status: &str) -> Result<(), OrderError> {
        let status: OrderStatus = status.parse().map_err(OrderError::InvalidStatus)?;

        OrderRepository::new(&self.pool)
            .update_status(id, status)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => OrderError::NotFound,
                other => OrderError::Repository(other),
            })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use marigold_core::PricingRules;

    use super::*;

    #[test]
    fn test_checkout_request_ignores_client_totals() {
        // A tampering client submits its own totals; serde drops them and
        // only the lines survive to be recomputed.
        let request: CheckoutRequest = serde_json::from_str(
            r#"{
                "items": [{"title": "Red Top", "price": 300, "quantity": 1}],
                "address": {
                    "name": "A Kumar", "line1": "12 MG Road",
                    "city": "Pune", "state": "MH", "pincode": "411001"
                },
                "subtotal": 1, "shipping": 0, "tax": 0, "total": 1
            }"#,
        )
        .unwrap();

        let totals = compute_totals(&request.items, &PricingRules::default());
        assert_eq!(totals.total, Decimal::from(375));
    }

    #[test]
    fn test_zero_lines_are_not_purchasable() {
        let items: Vec<LineItem> = serde_json::from_str(
            r#"[{"title": "ghost", "price": "abc", "quantity": 3},
                {"title": "ghost2", "price": 100, "quantity": 0}]"#,
        )
        .unwrap();
        assert!(items.iter().all(|i| i.line_total().is_zero()));
    }
}
