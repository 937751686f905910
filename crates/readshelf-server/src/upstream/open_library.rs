//! Open Library URL builders and normalizers (search + bibkeys APIs).

use serde_json::Value;
use url::Url;

use readshelf_core::types::{OpenLibraryBook, OpenLibraryDoc, fetched_at};
use readshelf_core::{Error, Result};

/// Fields requested from the search API; keeps result documents small.
const SEARCH_FIELDS: &str = "key,title,author_name,isbn,cover_edition_key,first_publish_year";

/// Subjects are capped per book record.
const MAX_SUBJECTS: usize = 25;

pub fn search_url(base: &str, query: &str, page: u32, limit: u32) -> Result<Url> {
    let mut url = parse(base, "/search.json")?;
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("page", &page.to_string())
        .append_pair("limit", &limit.to_string())
        .append_pair("fields", SEARCH_FIELDS);
    Ok(url)
}

pub fn book_url(base: &str, bib_key: &str) -> Result<Url> {
    let mut url = parse(base, "/api/books")?;
    url.query_pairs_mut()
        .append_pair("bibkeys", bib_key)
        .append_pair("format", "json")
        .append_pair("jscmd", "data");
    Ok(url)
}

fn parse(base: &str, path: &str) -> Result<Url> {
    Url::parse(&format!("{base}{path}"))
        .map_err(|e| Error::Network(format!("invalid Open Library URL: {e}")))
}

pub fn normalize_doc(doc: &Value) -> OpenLibraryDoc {
    let work_key = super::string_of(doc, "key");
    let id = work_key
        .strip_prefix("/works/")
        .unwrap_or(&work_key)
        .to_string();
    let isbn13 = doc["isbn"]
        .as_array()
        .and_then(|isbns| isbns.iter().filter_map(|i| i.as_str()).find(|i| is_isbn13(i)))
        .map(str::to_string);
    let olid = super::opt_string(doc, "cover_edition_key");
    let cover_url = if let Some(ref isbn) = isbn13 {
        Some(format!("https://covers.openlibrary.org/b/isbn/{isbn}-L.jpg"))
    } else {
        olid.as_ref()
            .map(|o| format!("https://covers.openlibrary.org/b/olid/{o}-L.jpg"))
    };
    OpenLibraryDoc {
        id,
        title: super::opt_string(doc, "title").unwrap_or_else(|| "Untitled".to_string()),
        authors: super::string_array(doc, "author_name"),
        isbn13,
        olid,
        year: doc["first_publish_year"].as_i64().map(|y| y as i32),
        cover_url,
    }
}

/// Normalize the record stored under `bib_key` in a bibkeys response.
pub fn normalize_book(bib_key: &str, raw: &Value) -> OpenLibraryBook {
    let key = super::string_of(raw, "key");
    let id = if key.is_empty() {
        bib_key.to_string()
    } else {
        key.strip_prefix("/books/").unwrap_or(&key).to_string()
    };
    OpenLibraryBook {
        id,
        title: super::string_of(raw, "title"),
        authors: named_entries(raw, "authors", usize::MAX),
        pages: raw["number_of_pages"].as_u64().map(|n| n as u32),
        subjects: named_entries(raw, "subjects", MAX_SUBJECTS),
        publish_date: super::opt_string(raw, "publish_date"),
        publishers: named_entries(raw, "publishers", usize::MAX),
        cover: non_null(&raw["cover"]),
        identifiers: raw
            .get("identifiers")
            .cloned()
            .unwrap_or_else(|| Value::Object(Default::default())),
        url: super::opt_string(raw, "url"),
        preview: super::opt_string(raw, "preview"),
        fetched_at: fetched_at(),
    }
}

fn is_isbn13(candidate: &str) -> bool {
    candidate.len() == 13
        && candidate
            .chars()
            .all(|c| c.is_ascii_digit() || c == 'X' || c == 'x')
}

/// Collect the `name` field of each entry in an array of objects.
fn named_entries(value: &Value, key: &str, cap: usize) -> Vec<String> {
    value[key]
        .as_array()
        .map(|entries| {
            entries
                .iter()
                .filter_map(|e| e["name"].as_str())
                .take(cap)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn non_null(value: &Value) -> Option<Value> {
    if value.is_null() {
        None
    } else {
        Some(value.clone())
    }
}
