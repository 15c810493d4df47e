//! URL slug normalization.
//!
//! Every path that derives a slug from display text (product create/update,
//! catalog seeding, offline re-slugging) goes through [`slugify`]. Uniqueness
//! is a separate concern handled by the storefront's slug resolver against
//! the catalog store.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

/// Normalize display text into a URL-safe slug token.
///
/// - Decomposes Unicode (NFKD) and drops combining marks, so `Café` → `cafe`
/// - Lowercases
/// - Replaces every run of characters outside `[a-z0-9]` with a single `-`
/// - Trims leading and trailing separators
///
/// The result matches `^[a-z0-9]+(-[a-z0-9]+)*$`, or is empty when the input
/// has no usable characters (callers substitute an opaque token in that
/// case; an empty slug is never persisted).
///
/// ```
/// use marigold_core::slugify;
///
/// assert_eq!(slugify("Café Crème Léggings!!"), "cafe-creme-leggings");
/// assert_eq!(slugify("  Red   Top  "), "red-top");
/// assert_eq!(slugify("!!!"), "");
/// ```
#[must_use]
pub fn slugify(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_separator = false;

    for decomposed in text.nfkd() {
        if is_combining_mark(decomposed) {
            continue;
        }
        for ch in decomposed.to_lowercase() {
            if ch.is_ascii_alphanumeric() {
                if pending_separator && !out.is_empty() {
                    out.push('-');
                }
                pending_separator = false;
                out.push(ch);
            } else {
                pending_separator = true;
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Charset predicate from the slug invariant: lowercase ASCII
    /// alphanumerics in `-`-separated runs.
    fn is_valid_slug(value: &str) -> bool {
        !value.is_empty()
            && !value.starts_with('-')
            && !value.ends_with('-')
            && !value.contains("--")
            && value
                .chars()
                .all(|ch| ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-')
    }

    #[test]
    fn test_diacritics_stripped() {
        assert_eq!(slugify("Café Crème Léggings!!"), "cafe-creme-leggings");
        assert_eq!(slugify("Über Étoile"), "uber-etoile");
        assert_eq!(slugify("naïve façade"), "naive-facade");
    }

    #[test]
    fn test_symbol_runs_collapse() {
        assert_eq!(slugify("Red -- / Top"), "red-top");
        assert_eq!(slugify("A+B=C"), "a-b-c");
        assert_eq!(slugify("100% Cotton (Pack of 2)"), "100-cotton-pack-of-2");
    }

    #[test]
    fn test_trimmed() {
        assert_eq!(slugify("  Red Top  "), "red-top");
        assert_eq!(slugify("--red-top--"), "red-top");
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(slugify(""), "");
        assert_eq!(slugify("   "), "");
        assert_eq!(slugify("!!!"), "");
        // Non-Latin scripts have no ASCII decomposition
        assert_eq!(slugify("कुर्ता"), "");
    }

    #[test]
    fn test_idempotent() {
        for text in [
            "Café Crème Léggings!!",
            "Red Top",
            "100% Cotton",
            "",
            "a-b-c",
            "  spaced   out  ",
        ] {
            let once = slugify(text);
            assert_eq!(slugify(&once), once, "slugify not idempotent for {text:?}");
        }
    }

    #[test]
    fn test_charset_invariant() {
        for text in [
            "Café Crème Léggings!!",
            "Ünïcödé Sôup",
            "!!!leading and trailing!!!",
            "MiXeD CaSe 123",
            "tabs\tand\nnewlines",
        ] {
            let slug = slugify(text);
            assert!(
                slug.is_empty() || is_valid_slug(&slug),
                "invalid slug {slug:?} from {text:?}"
            );
        }
    }
}
