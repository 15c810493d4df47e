//! Product repository for catalog database operations.

use sqlx::PgPool;

use marigold_core::ProductId;

use super::RepositoryError;
use crate::models::product::{NewProduct, Product};

/// Message attached to slug unique-violation conflicts.
const SLUG_CONFLICT: &str = "slug already exists";

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<Vec<Product>, RepositoryError> {
        let products = sqlx::query_as::<_, Product>(
            r"
            SELECT id, title, slug, price, mrp, stock, images, colors, sizes,
                   created_at, updated_at
            FROM products
            ORDER BY created_at DESC, id DESC
            LIMIT $1 OFFSET $2
            ",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(self.pool)
        .await?;

        Ok(products)
    }

    /// Total number of products in the catalog.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Get a product by its ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, title, slug, price, mrp, stock, images, colors, sizes,
                   created_at, updated_at
            FROM products
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Get a product by its slug (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            SELECT id, title, slug, price, mrp, stock, images, colors, sizes,
                   created_at, updated_at
            FROM products
            WHERE LOWER(slug) = LOWER($1)
            ",
        )
        .bind(slug)
        .fetch_optional(self.pool)
        .await?;

        Ok(product)
    }

    /// Whether a slug is already taken, optionally excluding one record.
    ///
    /// This is the optimistic pre-check half of slug uniqueness; the
    /// `LOWER(slug)` unique index remains the authority at insert time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn slug_exists(
        &self,
        candidate: &str,
        exclude: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, bool>(
            r"
            SELECT EXISTS(
                SELECT 1 FROM products
                WHERE LOWER(slug) = LOWER($1)
                  AND ($2::BIGINT IS NULL OR id <> $2)
            )
            ",
        )
        .bind(candidate)
        .bind(exclude.map(|id| id.as_i64()))
        .fetch_one(self.pool)
        .await?;

        Ok(exists)
    }

    /// Insert a new product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the slug is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn insert(&self, new: &NewProduct) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            INSERT INTO products (title, slug, price, mrp, stock, images, colors, sizes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, title, slug, price, mrp, stock, images, colors, sizes,
                      created_at, updated_at
            ",
        )
        .bind(&new.title)
        .bind(&new.slug)
        .bind(new.price)
        .bind(new.mrp)
        .bind(new.stock)
        .bind(&new.images)
        .bind(&new.colors)
        .bind(&new.sizes)
        .fetch_one(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, SLUG_CONFLICT))?;

        Ok(product)
    }

    /// Replace a product's columns.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the product doesn't exist.
    /// Returns `RepositoryError::Conflict` if the new slug is already taken.
    /// Returns `RepositoryError::Database` for other database errors.
    pub async fn update(
        &self,
        id: ProductId,
        new: &NewProduct,
    ) -> Result<Product, RepositoryError> {
        let product = sqlx::query_as::<_, Product>(
            r"
            UPDATE products
            SET title = $2, slug = $3, price = $4, mrp = $5, stock = $6,
                images = $7, colors = $8, sizes = $9, updated_at = now()
            WHERE id = $1
            RETURNING id, title, slug, price, mrp, stock, images, colors, sizes,
                      created_at, updated_at
            ",
        )
        .bind(id)
        .bind(&new.title)
        .bind(&new.slug)
        .bind(new.price)
        .bind(new.mrp)
        .bind(new.stock)
        .bind(&new.images)
        .bind(&new.colors)
        .bind(&new.sizes)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| RepositoryError::from_sqlx(e, SLUG_CONFLICT))?;

        product.ok_or(RepositoryError::NotFound)
    }

    /// Delete a product.
    ///
    /// # Returns
    ///
    /// Returns `true` if the product was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(&self, id: ProductId) -> Result<bool, RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
