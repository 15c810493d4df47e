//! Catalog service: product reads with a cache, writes through the slug
//! resolver.
//!
//! Every create/update path goes through the same slugify + resolve pair;
//! there are no bespoke slug copies anywhere else. Writes implement the
//! dual-layer uniqueness guarantee: optimistic resolver pre-check, the
//! database's unique index as authority, and exactly one retry with a
//! random suffix when the insert loses the race.

use std::time::Duration;

use moka::future::Cache;
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use marigold_core::{Amount, ProductId};

use crate::db::{ProductRepository, RepositoryError};
use crate::models::product::{ImageRef, NewProduct, Product, normalize_images};
use crate::services::slug::{DEFAULT_MAX_ATTEMPTS, random_suffix_slug, resolve_unique_slug};

/// Product-by-slug cache tuning.
const CACHE_CAPACITY: u64 = 2_000;
const CACHE_TTL: Duration = Duration::from_secs(60);

/// Errors from catalog operations.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Product does not exist.
    #[error("product not found")]
    NotFound,

    /// Both the resolved slug and the one retry conflicted.
    #[error("could not allocate a unique slug")]
    SlugConflict,

    /// Request payload failed validation.
    #[error("invalid product data: {0}")]
    Invalid(String),

    /// Database failure.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Admin payload for creating or updating a product.
#[derive(Debug, Deserialize)]
pub struct ProductInput {
    pub title: String,
    /// Optional explicit slug text; the title is the base otherwise.
    /// Either way the value is slugified and resolved, never trusted.
    #[serde(default)]
    pub slug: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub mrp: Option<Decimal>,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub images: Vec<ImageRef>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<String>,
}

/// Catalog service.
pub struct CatalogService {
    pool: PgPool,
    by_slug: Cache<String, Product>,
}

impl CatalogService {
    /// Create the service with its read cache.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            by_slug: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        }
    }

    /// List products, newest first, with the catalog total.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` on database failure.
    pub async fn list(&self, limit: i64, offset: i64) -> Result<(Vec<Product>, i64), CatalogError> {
        let repo = ProductRepository::new(&self.pool);
        let products = repo.list(limit, offset).await?;
        let total = repo.count().await?;
        Ok((products, total))
    }

    /// Get a product by slug, read-through cached.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` on database failure.
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Product>, CatalogError> {
        let key = slug.to_lowercase();
        if let Some(product) = self.by_slug.get(&key).await {
            return Ok(Some(product));
        }

        let product = ProductRepository::new(&self.pool).get_by_slug(slug).await?;
        if let Some(ref product) = product {
            self.by_slug.insert(key, product.clone()).await;
        }
        Ok(product)
    }

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Invalid` for bad payloads,
    /// `CatalogError::SlugConflict` when the slug cannot be allocated even
    /// after the conflict retry, `CatalogError::Repository` otherwise.
    pub async fn create(&self, input: ProductInput) -> Result<Product, CatalogError> {
        let repo = ProductRepository::new(&self.pool);
        let (columns, slug_base) = validate(input)?;

        let slug = resolve_unique_slug(&repo, &slug_base, None, DEFAULT_MAX_ATTEMPTS).await?;
        let first_try = NewProduct {
            slug,
            ..columns.clone()
        };

        let product = match repo.insert(&first_try).await {
            Ok(product) => product,
            // Lost the check-then-act race: regenerate once, then give up.
            Err(RepositoryError::Conflict(_)) => {
                let retry = NewProduct {
                    slug: random_suffix_slug(&slug_base),
                    ..columns
                };
                repo.insert(&retry).await.map_err(|e| match e {
                    RepositoryError::Conflict(_) => CatalogError::SlugConflict,
                    other => CatalogError::Repository(other),
                })?
            }
            Err(other) => return Err(CatalogError::Repository(other)),
        };

        Ok(product)
    }

    /// Update a product, re-resolving the slug when the name changed.
    ///
    /// The resolver excludes the product's own record so an unchanged
    /// title keeps its slug instead of colliding with itself.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for unknown products, otherwise as
    /// [`Self::create`].
    pub async fn update(&self, id: ProductId, input: ProductInput) -> Result<Product, CatalogError> {
        let repo = ProductRepository::new(&self.pool);
        let existing = repo.get_by_id(id).await?.ok_or(CatalogError::NotFound)?;
        let (columns, slug_base) = validate(input)?;

        let slug = resolve_unique_slug(&repo, &slug_base, Some(id), DEFAULT_MAX_ATTEMPTS).await?;
        let first_try = NewProduct {
            slug,
            ..columns.clone()
        };

        let product = match repo.update(id, &first_try).await {
            Ok(product) => product,
            Err(RepositoryError::Conflict(_)) => {
                let retry = NewProduct {
                    slug: random_suffix_slug(&slug_base),
                    ..columns
                };
                match repo.update(id, &retry).await {
                    Ok(product) => product,
                    Err(RepositoryError::Conflict(_)) => return Err(CatalogError::SlugConflict),
                    Err(RepositoryError::NotFound) => return Err(CatalogError::NotFound),
                    Err(other) => return Err(CatalogError::Repository(other)),
                }
            }
            Err(RepositoryError::NotFound) => return Err(CatalogError::NotFound),
            Err(other) => return Err(CatalogError::Repository(other)),
        };

        // Drop both the old and new cache entries
        self.by_slug.invalidate(&existing.slug.to_lowercase()).await;
        self.by_slug.invalidate(&product.slug.to_lowercase()).await;

        Ok(product)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for unknown products.
    pub async fn delete(&self, id: ProductId) -> Result<(), CatalogError> {
        let repo = ProductRepository::new(&self.pool);
        let existing = repo.get_by_id(id).await?.ok_or(CatalogError::NotFound)?;

        if !repo.delete(id).await? {
            return Err(CatalogError::NotFound);
        }
        self.by_slug.invalidate(&existing.slug.to_lowercase()).await;
        Ok(())
    }
}

/// Validate an admin payload into column values plus the slug base text.
fn validate(input: ProductInput) -> Result<(NewProduct, String), CatalogError> {
    let title = input.title.trim().to_owned();
    if title.is_empty() {
        return Err(CatalogError::Invalid("title is required".to_owned()));
    }

    if input.price < Decimal::ZERO {
        return Err(CatalogError::Invalid("price must not be negative".to_owned()));
    }
    let price = Amount::new(input.price);
    // List price defaults to the selling price and can never undercut it
    let mrp = Amount::new(input.mrp.unwrap_or(input.price).max(input.price));

    if input.stock < 0 {
        return Err(CatalogError::Invalid("stock must not be negative".to_owned()));
    }

    let slug_base = input
        .slug
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(&title)
        .to_owned();

    let columns = NewProduct {
        title,
        slug: String::new(), // filled in by the caller after resolution
        price,
        mrp,
        stock: input.stock,
        images: normalize_images(input.images),
        colors: input.colors,
        sizes: input.sizes,
    };

    Ok((columns, slug_base))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn input(title: &str, price: i64) -> ProductInput {
        ProductInput {
            title: title.to_owned(),
            slug: None,
            price: Decimal::from(price),
            mrp: None,
            stock: 10,
            images: Vec::new(),
            colors: Vec::new(),
            sizes: Vec::new(),
        }
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let result = validate(input("   ", 100));
        assert!(matches!(result, Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn test_validate_rejects_negative_price() {
        let result = validate(input("Red Top", -1));
        assert!(matches!(result, Err(CatalogError::Invalid(_))));
    }

    #[test]
    fn test_validate_mrp_defaults_to_price_and_never_undercuts() {
        let (columns, _) = validate(input("Red Top", 499)).unwrap();
        assert_eq!(columns.mrp, Amount::from_rupees(499));

        let (columns, _) = validate(ProductInput {
            mrp: Some(Decimal::from(100)),
            ..input("Red Top", 499)
        })
        .unwrap();
        assert_eq!(columns.mrp, Amount::from_rupees(499));
    }

    #[test]
    fn test_validate_prefers_explicit_slug_text() {
        let (_, base) = validate(ProductInput {
            slug: Some("Summer Línea".to_owned()),
            ..input("Red Top", 499)
        })
        .unwrap();
        assert_eq!(base, "Summer Línea");

        let (_, base) = validate(input("Red Top", 499)).unwrap();
        assert_eq!(base, "Red Top");
    }
}
