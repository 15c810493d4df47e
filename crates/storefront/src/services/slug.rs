//! Unique slug resolution against the catalog store.
//!
//! [`marigold_core::slugify`] produces the base token; this module makes it
//! unique. Resolution is an optimistic check-then-act: two concurrent
//! creations with the same title can both pass the existence probe, so the
//! database's `LOWER(slug)` unique index stays the authority and callers
//! (see `CatalogService`) retry once with a random suffix when the insert
//! reports a conflict. Do not replace this with an in-process lock;
//! uniqueness must hold across server instances.

use thiserror::Error;
use uuid::Uuid;

use marigold_core::{ProductId, slugify};

use crate::db::RepositoryError;

/// Probe bound for interactive paths, where a usable slug must always come
/// back even if the incremental scheme is exhausted.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Probe bound for offline maintenance, where exhaustion should halt the
/// run instead.
pub const STRICT_MAX_ATTEMPTS: u32 = 5000;

/// Existence probe over the catalog store.
///
/// `exclude` carries the record being re-slugged so it does not collide
/// with itself.
pub trait SlugStore {
    /// Whether `candidate` is already taken by a record other than `exclude`.
    fn slug_exists(
        &self,
        candidate: &str,
        exclude: Option<ProductId>,
    ) -> impl Future<Output = Result<bool, RepositoryError>> + Send;
}

impl SlugStore for crate::db::ProductRepository<'_> {
    async fn slug_exists(
        &self,
        candidate: &str,
        exclude: Option<ProductId>,
    ) -> Result<bool, RepositoryError> {
        Self::slug_exists(self, candidate, exclude).await
    }
}

/// Errors from the strict resolver variant.
#[derive(Debug, Error)]
pub enum SlugError {
    /// Every candidate up to the attempt bound was taken.
    #[error("slug space exhausted for {base:?} after {attempts} attempts")]
    Exhausted { base: String, attempts: u32 },

    /// Store probe failed.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Resolve a slug for `base_text` that is unique at the moment of the check.
///
/// Probes `base`, `base-1`, `base-2`, … against the store. If the probe
/// space is exhausted, falls back to `base-<random suffix>` so a product
/// can still be saved; the store's unique index catches the (vanishingly
/// unlikely) remaining collision.
///
/// # Errors
///
/// Returns `RepositoryError` only if the existence probe itself fails.
pub async fn resolve_unique_slug<S: SlugStore>(
    store: &S,
    base_text: &str,
    exclude: Option<ProductId>,
    max_attempts: u32,
) -> Result<String, RepositoryError> {
    match probe(store, base_text, exclude, max_attempts).await {
        Ok(slug) => Ok(slug),
        Err(SlugError::Exhausted { base, attempts }) => {
            tracing::warn!(base, attempts, "slug probe exhausted, using random suffix");
            Ok(random_suffix_slug(&base))
        }
        Err(SlugError::Repository(e)) => Err(e),
    }
}

/// Strict variant for offline maintenance: exhaustion is an error.
///
/// # Errors
///
/// Returns `SlugError::Exhausted` when every candidate up to
/// `max_attempts` is taken, or `SlugError::Repository` if a probe fails.
pub async fn resolve_unique_slug_strict<S: SlugStore>(
    store: &S,
    base_text: &str,
    exclude: Option<ProductId>,
    max_attempts: u32,
) -> Result<String, SlugError> {
    probe(store, base_text, exclude, max_attempts).await
}

/// `base-<8 hex chars>`: the regeneration used both on probe exhaustion and
/// when an insert loses the check-then-act race and must retry once.
#[must_use]
pub fn random_suffix_slug(base: &str) -> String {
    format!("{base}-{}", opaque_token())
}

async fn probe<S: SlugStore>(
    store: &S,
    base_text: &str,
    exclude: Option<ProductId>,
    max_attempts: u32,
) -> Result<String, SlugError> {
    let base = base_slug(base_text);

    let mut candidate = base.clone();
    let mut counter: u32 = 0;

    while store.slug_exists(&candidate, exclude).await? {
        counter += 1;
        if counter > max_attempts {
            return Err(SlugError::Exhausted {
                base,
                attempts: counter,
            });
        }
        candidate = format!("{base}-{counter}");
    }

    Ok(candidate)
}

/// Slugified base text, or an opaque token when nothing slugifiable
/// remains. An empty slug is never returned.
fn base_slug(base_text: &str) -> String {
    let base = slugify(base_text);
    if base.is_empty() { opaque_token() } else { base }
}

/// Last 8 hex characters of a fresh UUID.
fn opaque_token() -> String {
    let id = Uuid::new_v4().simple().to_string();
    let tail = id.len().saturating_sub(8);
    id.get(tail..).unwrap_or(&id).to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use super::*;

    /// In-memory store: a set of taken slugs, each tagged with its owner.
    #[derive(Default)]
    struct MemoryStore {
        taken: Mutex<HashSet<(String, i64)>>,
    }

    impl MemoryStore {
        fn with(slugs: &[(&str, i64)]) -> Self {
            Self {
                taken: Mutex::new(
                    slugs
                        .iter()
                        .map(|(slug, owner)| ((*slug).to_owned(), *owner))
                        .collect(),
                ),
            }
        }

        fn claim(&self, slug: &str, owner: i64) {
            self.taken
                .lock()
                .unwrap()
                .insert((slug.to_owned(), owner));
        }
    }

    impl SlugStore for MemoryStore {
        async fn slug_exists(
            &self,
            candidate: &str,
            exclude: Option<ProductId>,
        ) -> Result<bool, RepositoryError> {
            let taken = self.taken.lock().unwrap();
            Ok(taken.iter().any(|(slug, owner)| {
                slug.eq_ignore_ascii_case(candidate)
                    && exclude.is_none_or(|id| id.as_i64() != *owner)
            }))
        }
    }

    #[tokio::test]
    async fn test_free_base_used_directly() {
        let store = MemoryStore::default();
        let slug = resolve_unique_slug(&store, "Red Top", None, DEFAULT_MAX_ATTEMPTS)
            .await
            .unwrap();
        assert_eq!(slug, "red-top");
    }

    #[tokio::test]
    async fn test_counter_probe_skips_taken() {
        // "red-top" and "red-top-1" exist; the resolver lands on -2
        let store = MemoryStore::with(&[("red-top", 1), ("red-top-1", 2)]);
        let slug = resolve_unique_slug(&store, "Red Top", None, DEFAULT_MAX_ATTEMPTS)
            .await
            .unwrap();
        assert_eq!(slug, "red-top-2");
    }

    #[tokio::test]
    async fn test_exclude_own_record() {
        // Re-slugging product 7 to a title whose slug it already owns
        let store = MemoryStore::with(&[("red-top", 7)]);
        let slug = resolve_unique_slug(
            &store,
            "Red Top",
            Some(ProductId::new(7)),
            DEFAULT_MAX_ATTEMPTS,
        )
        .await
        .unwrap();
        assert_eq!(slug, "red-top");
    }

    #[tokio::test]
    async fn test_empty_base_gets_opaque_token() {
        let store = MemoryStore::default();
        let slug = resolve_unique_slug(&store, "!!!", None, DEFAULT_MAX_ATTEMPTS)
            .await
            .unwrap();
        assert_eq!(slug.len(), 8);
        assert!(slug.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_exhaustion_falls_back_to_random_suffix() {
        let store = MemoryStore::with(&[("red-top", 1), ("red-top-1", 2), ("red-top-2", 3)]);
        let slug = resolve_unique_slug(&store, "Red Top", None, 2)
            .await
            .unwrap();
        // Not one of the probed candidates; still a usable slug value
        assert!(slug.starts_with("red-top-"));
        assert!(!["red-top", "red-top-1", "red-top-2"].contains(&slug.as_str()));
    }

    #[tokio::test]
    async fn test_strict_variant_errors_on_exhaustion() {
        let store = MemoryStore::with(&[("red-top", 1), ("red-top-1", 2), ("red-top-2", 3)]);
        let result = resolve_unique_slug_strict(&store, "Red Top", None, 2).await;
        assert!(matches!(result, Err(SlugError::Exhausted { .. })));
    }

    #[tokio::test]
    async fn test_sequential_resolutions_never_collide() {
        let store = MemoryStore::default();
        let mut seen = HashSet::new();
        for owner in 0..10_i64 {
            let slug = resolve_unique_slug(&store, "Red Top", None, DEFAULT_MAX_ATTEMPTS)
                .await
                .unwrap();
            assert!(seen.insert(slug.clone()), "duplicate slug {slug}");
            store.claim(&slug, owner);
        }
    }

    #[tokio::test]
    async fn test_case_insensitive_collision() {
        let store = MemoryStore::with(&[("Red-Top", 1)]);
        let slug = resolve_unique_slug(&store, "red top", None, DEFAULT_MAX_ATTEMPTS)
            .await
            .unwrap();
        assert_eq!(slug, "red-top-1");
    }
}
