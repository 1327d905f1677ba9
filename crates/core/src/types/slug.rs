//! URL slugs derived from product names.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A lowercase, hyphen-separated URL segment.
///
/// Product slugs are always derived from the product name so the storefront
/// can link to `/products/{slug}`.
///
/// ```
/// use toko_core::Slug;
///
/// assert_eq!(Slug::from_name("Kopi Gayo  250g").as_str(), "kopi-gayo-250g");
/// assert_eq!(Slug::from_name("Teh Tarik (Original)!").as_str(), "teh-tarik-original");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(feature = "postgres", sqlx(transparent))]
pub struct Slug(String);

impl Slug {
    /// Derive a slug from a display name.
    ///
    /// ASCII letters and digits are kept (lowercased); every other run of
    /// characters collapses into a single `-`. Leading and trailing
    /// separators are dropped.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let mut slug = String::with_capacity(name.len());
        let mut pending_dash = false;

        for ch in name.chars() {
            if ch.is_ascii_alphanumeric() {
                if pending_dash && !slug.is_empty() {
                    slug.push('-');
                }
                pending_dash = false;
                slug.push(ch.to_ascii_lowercase());
            } else {
                pending_dash = true;
            }
        }

        Self(slug)
    }

    /// Whether the name produced no usable characters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the slug as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collapses_separators() {
        assert_eq!(Slug::from_name("  Sambal -- Bawang  ").as_str(), "sambal-bawang");
    }

    #[test]
    fn test_drops_non_ascii() {
        assert_eq!(Slug::from_name("Café Crème").as_str(), "caf-cr-me");
    }

    #[test]
    fn test_empty_when_no_alphanumerics() {
        assert!(Slug::from_name("!!!").is_empty());
    }
}
