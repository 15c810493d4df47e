//! Seed the catalog with demo products.
//!
//! Inserts go through `CatalogService::create`, i.e. the same slugify +
//! resolve + conflict-retry pipeline as the admin API - the seeder has no
//! slug logic of its own. Re-running the command adds suffixed slugs
//! rather than failing, which is what you want for a demo data set.

use rust_decimal::Decimal;
use tracing::info;

use marigold_storefront::services::catalog::{CatalogService, ProductInput};

use super::{CommandError, connect};

struct DemoProduct {
    title: &'static str,
    price: i64,
    mrp: i64,
    stock: i32,
    colors: &'static [&'static str],
    sizes: &'static [&'static str],
}

const DEMO_PRODUCTS: &[DemoProduct] = &[
    DemoProduct {
        title: "Café Crème Leggings",
        price: 499,
        mrp: 999,
        stock: 120,
        colors: &["beige", "black"],
        sizes: &["S", "M", "L", "XL"],
    },
    DemoProduct {
        title: "Red Top",
        price: 300,
        mrp: 499,
        stock: 80,
        colors: &["red"],
        sizes: &["S", "M", "L"],
    },
    DemoProduct {
        title: "Printed Kurti - Indigo",
        price: 799,
        mrp: 1299,
        stock: 45,
        colors: &["indigo", "white"],
        sizes: &["M", "L", "XL"],
    },
    DemoProduct {
        title: "Cotton Palazzo",
        price: 649,
        mrp: 899,
        stock: 60,
        colors: &["white", "navy", "olive"],
        sizes: &["Free Size"],
    },
    DemoProduct {
        title: "Festive Dupatta",
        price: 350,
        mrp: 550,
        stock: 200,
        colors: &["gold", "maroon"],
        sizes: &[],
    },
];

/// Insert the demo catalog.
///
/// # Errors
///
/// Returns an error if the database is unreachable or an insert fails.
pub async fn run() -> Result<(), CommandError> {
    let pool = connect().await?;
    let catalog = CatalogService::new(pool);

    for demo in DEMO_PRODUCTS {
        let input = ProductInput {
            title: demo.title.to_owned(),
            slug: None,
            price: Decimal::from(demo.price),
            mrp: Some(Decimal::from(demo.mrp)),
            stock: demo.stock,
            images: Vec::new(),
            colors: demo.colors.iter().map(|&c| c.to_owned()).collect(),
            sizes: demo.sizes.iter().map(|&s| s.to_owned()).collect(),
        };

        let product = catalog.create(input).await?;
        info!(slug = %product.slug, "seeded {}", product.title);
    }

    info!("Seeded {} products", DEMO_PRODUCTS.len());
    Ok(())
}
