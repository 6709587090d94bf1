//! URL slugs derived from article titles

/// Slug used when a title has no sluggable characters
pub const FALLBACK_SLUG: &str = "article";

/// Derive a URL-friendly slug from `title`
///
/// Lowercases, drops everything except alphanumerics, whitespace, `_` and
/// `-`, then collapses runs of whitespace and `-` into a single `-`.
#[must_use]
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;

    for ch in title.chars().flat_map(char::to_lowercase) {
        if ch.is_whitespace() || ch == '-' {
            pending_dash = true;
        } else if ch.is_alphanumeric() || ch == '_' {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch);
        }
    }

    if slug.is_empty() {
        FALLBACK_SLUG.to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn slugify_basic_title() {
        assert_eq!(slugify("How to train your dragon"), "how-to-train-your-dragon");
    }

    #[test]
    fn slugify_strips_punctuation_and_collapses_separators() {
        assert_eq!(
            slugify("React Hooks: Best Practices -- and  Pitfalls!"),
            "react-hooks-best-practices-and-pitfalls"
        );
        assert_eq!(slugify("  --leading and trailing--  "), "leading-and-trailing");
    }

    #[test]
    fn slugify_keeps_underscores_and_unicode_letters() {
        assert_eq!(slugify("snake_case Été"), "snake_case-été");
    }

    #[test]
    fn slugify_falls_back_when_nothing_left() {
        assert_eq!(slugify("!!!"), FALLBACK_SLUG);
        assert_eq!(slugify(""), FALLBACK_SLUG);
    }

    proptest! {
        #[test]
        fn prop_slug_is_url_safe(title in ".{0,80}") {
            let slug = slugify(&title);
            prop_assert!(!slug.is_empty());
            prop_assert!(!slug.starts_with('-'));
            prop_assert!(!slug.ends_with('-'));
            prop_assert!(!slug.contains("--"));
            prop_assert!(slug.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-'));
        }

        #[test]
        fn prop_slug_is_idempotent(title in "[a-zA-Z0-9 _-]{1,60}") {
            let once = slugify(&title);
            prop_assert_eq!(slugify(&once), once);
        }
    }
}
