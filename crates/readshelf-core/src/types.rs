//! Normalized record shapes for the proxied data sources.
//!
//! Field names and presence are part of the external contract consumed by the
//! frontend; every struct here serializes to the exact JSON shape the
//! original routes exposed. Records are built once per upstream fetch and are
//! immutable afterwards, so the payload a cache entry replays is
//! byte-identical to the payload that was first normalized.

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// RFC 3339 timestamp (millisecond precision, UTC) stamped into every
/// response envelope as `fetched_at`.
pub fn fetched_at() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

// ---- NYT Best Sellers ----

/// One entry of the NYT list-names catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListName {
    pub list_name: String,
    pub display_name: String,
    /// Update cadence, e.g. "WEEKLY" or "MONTHLY".
    pub updated: String,
    pub oldest_published_date: String,
    pub newest_published_date: String,
}

/// One ranked book on a best-seller list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestsellerEntry {
    pub rank: u32,
    pub title: String,
    pub author: String,
    pub description: Option<String>,
    pub primary_isbn13: Option<String>,
    pub publisher: Option<String>,
    pub book_image: Option<String>,
    pub list_name: String,
    pub weeks_on_list: u32,
    pub amazon_url: Option<String>,
}

/// Response envelope of `/api/nyt/list-names`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListNamesPayload {
    #[serde(rename = "listNames")]
    pub list_names: Vec<ListName>,
    pub count: usize,
    pub fetched_at: String,
}

/// One list within the `/api/nyt/overview` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewList {
    pub list_name: String,
    pub display_name: String,
    pub updated: String,
    pub entries: Vec<BestsellerEntry>,
}

/// Response envelope of `/api/nyt/overview`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewPayload {
    pub date: String,
    pub lists: Vec<OverviewList>,
    pub fetched_at: String,
}

/// Response envelope of `/api/nyt/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListPayload {
    pub list_name: String,
    pub display_name: String,
    pub date: String,
    pub next_published_date: Option<String>,
    pub previous_published_date: Option<String>,
    pub updated: Option<String>,
    pub offset: u32,
    pub entries: Vec<BestsellerEntry>,
    pub fetched_at: String,
}

// ---- Google Books ----

/// ISBN pair extracted from a volume's industry identifiers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct IdentifierPair {
    pub isbn10: Option<String>,
    pub isbn13: Option<String>,
}

/// Access metadata present only on full volume records.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeAccessInfo {
    pub viewability: Option<String>,
    pub embeddable: bool,
    pub public_domain: bool,
    pub web_reader_link: Option<String>,
    pub country: Option<String>,
}

/// A normalized Google Books volume. Search results omit `accessInfo`;
/// the single-volume route includes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub authors: Vec<String>,
    pub description: Option<String>,
    pub categories: Vec<String>,
    pub thumbnail: Option<String>,
    pub preview_link: Option<String>,
    pub info_link: Option<String>,
    pub publisher: Option<String>,
    pub published_date: Option<String>,
    pub page_count: Option<u32>,
    pub language: Option<String>,
    pub industry_identifiers: IdentifierPair,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_info: Option<VolumeAccessInfo>,
}

/// Response envelope of `/api/books/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchPayload {
    pub total_items: u64,
    pub start_index: u32,
    pub max_results: u32,
    pub items: Vec<Volume>,
    pub fetched_at: String,
}

/// Per-ISBN enrichment record of `/api/books/enrich`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeEnrichment {
    pub preview_link: Option<String>,
    pub thumbnail: Option<String>,
    pub categories: Vec<String>,
    pub page_count: Option<u32>,
}

// ---- Open Library ----

/// A normalized Open Library search document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenLibraryDoc {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub isbn13: Option<String>,
    pub olid: Option<String>,
    pub year: Option<i32>,
    #[serde(rename = "coverUrl")]
    pub cover_url: Option<String>,
}

/// Response envelope of `/api/open/search`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenSearchPayload {
    pub query: String,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    #[serde(rename = "totalPages")]
    pub total_pages: u64,
    pub items: Vec<OpenLibraryDoc>,
    pub fetched_at: String,
}

/// A normalized Open Library book record (from the bibkeys API).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenLibraryBook {
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub pages: Option<u32>,
    pub subjects: Vec<String>,
    #[serde(rename = "publishDate")]
    pub publish_date: Option<String>,
    pub publishers: Vec<String>,
    /// Raw cover object (`{small, medium, large}`) passed through as-is.
    pub cover: Option<Value>,
    pub identifiers: Value,
    pub url: Option<String>,
    pub preview: Option<String>,
    pub fetched_at: String,
}
