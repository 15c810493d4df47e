//! Order repository.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};

use marigold_core::{OrderId, Totals, UserId};

use super::RepositoryError;
use crate::models::order::{Order, OrderItem, OrderStatus, OrderWithItems, ShippingAddress};

/// Raw `orders` row; converted into [`Order`] after status parsing.
#[derive(FromRow)]
struct OrderRow {
    id: OrderId,
    user_id: UserId,
    status: String,
    subtotal: Decimal,
    shipping: Decimal,
    tax: Decimal,
    discount: Decimal,
    total: Decimal,
    ship_name: String,
    ship_line1: String,
    ship_line2: Option<String>,
    ship_city: String,
    ship_state: String,
    ship_pincode: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for Order {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status: OrderStatus = row
            .status
            .parse()
            .map_err(RepositoryError::DataCorruption)?;

        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            status,
            subtotal: row.subtotal,
            shipping: row.shipping,
            tax: row.tax,
            discount: row.discount,
            total: row.total,
            address: ShippingAddress {
                name: row.ship_name,
                line1: row.ship_line1,
                line2: row.ship_line2,
                city: row.ship_city,
                state: row.ship_state,
                pincode: row.ship_pincode,
            },
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const SELECT_ORDER: &str = r"
    SELECT id, user_id, status, subtotal, shipping, tax, discount, total,
           ship_name, ship_line1, ship_line2, ship_city, ship_state, ship_pincode,
           created_at, updated_at
    FROM orders
";

/// A line to persist; already sanitized by the order service.
#[derive(Debug, Clone)]
pub struct NewOrderItem {
    pub product_id: Option<marigold_core::ProductId>,
    pub title: String,
    pub price: Decimal,
    pub quantity: i32,
    pub color: Option<String>,
    pub size: Option<String>,
    pub image: Option<String>,
}

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Persist an order with its lines in one transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails; the
    /// transaction rolls back and nothing is persisted.
    pub async fn create(
        &self,
        user_id: UserId,
        address: &ShippingAddress,
        items: &[NewOrderItem],
        totals: &Totals,
    ) -> Result<OrderWithItems, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, OrderRow>(
            r"
            INSERT INTO orders (user_id, status, subtotal, shipping, tax, discount, total,
                                ship_name, ship_line1, ship_line2, ship_city, ship_state,
                                ship_pincode)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING id, user_id, status, subtotal, shipping, tax, discount, total,
                      ship_name, ship_line1, ship_line2, ship_city, ship_state, ship_pincode,
                      created_at, updated_at
            ",
        )
        .bind(user_id)
        .bind(OrderStatus::Placed.as_str())
        .bind(totals.subtotal)
        .bind(totals.shipping)
        .bind(totals.tax)
        .bind(totals.discount)
        .bind(totals.total)
        .bind(&address.name)
        .bind(&address.line1)
        .bind(&address.line2)
        .bind(&address.city)
        .bind(&address.state)
        .bind(&address.pincode)
        .fetch_one(&mut *tx)
        .await?;

        let order: Order = row.try_into()?;

        let mut persisted_items = Vec::with_capacity(items.len());
        for item in items {
            let persisted = sqlx::query_as::<_, OrderItem>(
                r"
                INSERT INTO order_items (order_id, product_id, title, price, quantity,
                                         color, size, image)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                RETURNING id, order_id, product_id, title, price, quantity, color, size, image
                ",
            )
            .bind(order.id)
            .bind(item.product_id)
            .bind(&item.title)
            .bind(item.price)
            .bind(item.quantity)
            .bind(&item.color)
            .bind(&item.size)
            .bind(&item.image)
            .fetch_one(&mut *tx)
            .await?;

            persisted_items.push(persisted);
        }

        tx.commit().await?;

        Ok(OrderWithItems {
            order,
            items: persisted_items,
        })
    }

    /// Get one order with its lines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_with_items(
        &self,
        id: OrderId,
    ) -> Result<Option<OrderWithItems>, RepositoryError> {
        let row = sqlx::query_as::<_, OrderRow>(&format!("{SELECT_ORDER} WHERE id = $1"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let order: Order = row.try_into()?;

        let items = self.items_for(order.id).await?;
        Ok(Some(OrderWithItems { order, items }))
    }

    /// List a user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// List all orders, newest first (admin view).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_all(&self, limit: i64, offset: i64) -> Result<Vec<Order>, RepositoryError> {
        let rows = sqlx::query_as::<_, OrderRow>(&format!(
            "{SELECT_ORDER} ORDER BY created_at DESC, id DESC LIMIT $1 OFFSET $2"
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(Order::try_from).collect()
    }

    /// Update an order's fulfillment status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE orders
            SET status = $2, updated_at = now()
            WHERE id = $1
            ",
        )
        .bind(id)
        .bind(status.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Lines for one order, in insertion order.
    async fn items_for(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError> {
        let items = sqlx::query_as::<_, OrderItem>(
            r"
            SELECT id, order_id, product_id, title, price, quantity, color, size, image
            FROM order_items
            WHERE order_id = $1
            ORDER BY id ASC
            ",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        Ok(items)
    }
}
