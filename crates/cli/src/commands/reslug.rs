//! Re-derive product slugs from titles.
//!
//! Offline maintenance for catalogs whose slugs drifted (imports, renamed
//! titles). Uses the strict resolver variant: on probe exhaustion the run
//! halts with an error instead of inventing a random suffix, so an
//! operator sees the problem rather than shipping opaque URLs. Each
//! product excludes itself from the uniqueness check, so stable slugs stay
//! untouched.

use tracing::{info, warn};

use marigold_storefront::db::ProductRepository;
use marigold_storefront::models::product::NewProduct;
use marigold_storefront::services::slug::{STRICT_MAX_ATTEMPTS, resolve_unique_slug_strict};

use super::{CommandError, connect};

const PAGE_SIZE: i64 = 200;

/// Recompute every product's slug from its title.
///
/// # Errors
///
/// Returns an error if the database is unreachable, an update fails, or
/// the slug space for some title is exhausted.
pub async fn run(dry_run: bool) -> Result<(), CommandError> {
    let pool = connect().await?;
    let repo = ProductRepository::new(&pool);

    let mut offset = 0_i64;
    let mut changed = 0_usize;
    let mut scanned = 0_usize;

    loop {
        let page = repo.list(PAGE_SIZE, offset).await?;
        if page.is_empty() {
            break;
        }
        offset += i64::try_from(page.len()).unwrap_or(PAGE_SIZE);

        for product in page {
            scanned += 1;

            let resolved = resolve_unique_slug_strict(
                &repo,
                &product.title,
                Some(product.id),
                STRICT_MAX_ATTEMPTS,
            )
            .await?;

            if resolved == product.slug {
                continue;
            }

            changed += 1;
            if dry_run {
                info!(id = %product.id, from = %product.slug, to = %resolved, "would reslug");
                continue;
            }

            let update = NewProduct {
                title: product.title.clone(),
                slug: resolved.clone(),
                price: product.price,
                mrp: product.mrp,
                stock: product.stock,
                images: product.images.clone(),
                colors: product.colors.clone(),
                sizes: product.sizes.clone(),
            };
            repo.update(product.id, &update).await?;
            info!(id = %product.id, from = %product.slug, to = %resolved, "reslugged");
        }
    }

    if dry_run && changed > 0 {
        warn!("dry run: {changed} of {scanned} products would change");
    } else {
        info!("reslug complete: {changed} of {scanned} products changed");
    }
    Ok(())
}
