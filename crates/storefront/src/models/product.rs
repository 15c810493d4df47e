//! Catalog product models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use marigold_core::{Amount, ProductId};

/// A catalog product.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    /// URL-safe unique identifier; unique case-insensitively across the
    /// catalog (enforced by a `LOWER(slug)` unique index).
    pub slug: String,
    pub price: Amount,
    /// List price shown struck through; always `>= price`.
    pub mrp: Amount,
    pub stock: i32,
    /// Ordered image URLs, first is the primary image.
    pub images: Vec<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated column values for a product insert or update.
///
/// The slug has already been through the resolver; repositories persist
/// this as-is and surface unique violations as conflicts.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub title: String,
    pub slug: String,
    pub price: Amount,
    pub mrp: Amount,
    pub stock: i32,
    pub images: Vec<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
}

/// One image reference in an admin payload.
///
/// Clients send image lists in several shapes (`"https://…"`,
/// `{"url": "…"}`, `{"src": "…"}`); this normalizer flattens them at the
/// request boundary so the rest of the catalog only ever sees URLs.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ImageRef {
    Url(String),
    Object {
        #[serde(alias = "src")]
        url: String,
    },
}

impl ImageRef {
    /// The image URL regardless of payload shape.
    #[must_use]
    pub fn into_url(self) -> String {
        match self {
            Self::Url(url) | Self::Object { url } => url,
        }
    }
}

/// Normalize a heterogeneous image list into plain URLs, dropping blanks.
#[must_use]
pub fn normalize_images(refs: Vec<ImageRef>) -> Vec<String> {
    refs.into_iter()
        .map(ImageRef::into_url)
        .map(|url| url.trim().to_owned())
        .filter(|url| !url.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_image_ref_accepts_mixed_shapes() {
        let refs: Vec<ImageRef> = serde_json::from_str(
            r#"["https://cdn.example/a.jpg",
                {"url": "https://cdn.example/b.jpg"},
                {"src": "https://cdn.example/c.jpg"},
                "  "]"#,
        )
        .unwrap();

        let urls = normalize_images(refs);
        assert_eq!(
            urls,
            vec![
                "https://cdn.example/a.jpg",
                "https://cdn.example/b.jpg",
                "https://cdn.example/c.jpg",
            ]
        );
    }
}
