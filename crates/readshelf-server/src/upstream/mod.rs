//! Upstream HTTP access: the retrying fetcher plus per-source URL builders
//! and payload normalizers.

pub mod fetch;
pub mod google_books;
pub mod nyt;
pub mod open_library;

pub use fetch::Fetcher;

use serde_json::Value;

/// Non-empty string field of a JSON object, or the default.
pub(crate) fn string_of(value: &Value, key: &str) -> String {
    value[key].as_str().unwrap_or_default().to_string()
}

/// Non-empty string field of a JSON object, or `None`.
pub(crate) fn opt_string(value: &Value, key: &str) -> Option<String> {
    value[key].as_str().filter(|s| !s.is_empty()).map(str::to_string)
}

pub(crate) fn string_array(value: &Value, key: &str) -> Vec<String> {
    value[key]
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}
