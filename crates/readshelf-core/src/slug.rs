//! NYT list-slug helpers.
//!
//! List identifiers arrive in three forms: exact machine slugs
//! (`hardcover-fiction`), human display names (`Hardcover Fiction`), or
//! URL-encoded display names with pluses for spaces. The pure transforms live
//! here; catalog-backed resolution is layered on top by the NYT route, which
//! owns the cached list-names catalog.

use std::sync::LazyLock;

use regex::Regex;

static SLUG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").expect("valid slug regex"));

/// NYT renamed a handful of lists over the years; old slugs still circulate
/// in bookmarks and the frontend's saved state.
const LIST_SLUG_ALIASES: &[(&str, &str)] = &[
    ("children-s-middle-grade-hardcover", "childrens-middle-grade-hardcover"),
    ("childrens-middle-grade-hardcover", "childrens-middle-grade-hardcover"),
    ("young-adult-hardcover", "young-adult-hardcover"),
];

/// Whether `input` already looks like a machine slug.
pub fn is_slug_shaped(input: &str) -> bool {
    SLUG_RE.is_match(input)
}

/// Look up a known historical rename for a slug.
pub fn resolve_alias(slug: &str) -> Option<&'static str> {
    LIST_SLUG_ALIASES
        .iter()
        .find(|(from, _)| *from == slug)
        .map(|(_, to)| *to)
}

/// Best-effort slugification of a display name, matching the scheme NYT uses
/// for its own `list_name_encoded` values.
pub fn slugify_display_name(name: &str) -> String {
    let mut text = String::with_capacity(name.len());
    for c in name.to_lowercase().chars() {
        match c {
            '\'' | '\u{2019}' => {}
            '&' => text.push_str(" and "),
            '+' => text.push_str(" plus "),
            other => text.push(other),
        }
    }

    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }
    slug
}
