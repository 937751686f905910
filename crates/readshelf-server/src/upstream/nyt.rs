//! NYT Books API URL builders and payload normalizers.
//!
//! Every NYT body carries a top-level `status` field; anything other than
//! `"OK"` is treated as an unexpected payload even on HTTP 200.

use serde_json::Value;
use url::Url;

use readshelf_core::types::{
    BestsellerEntry, ListName, ListNamesPayload, ListPayload, OverviewList, OverviewPayload,
    fetched_at,
};
use readshelf_core::{Error, Result};

pub fn list_names_url(base: &str, api_key: &str) -> Result<Url> {
    let mut url = parse(base, "/lists/names.json")?;
    url.query_pairs_mut().append_pair("api-key", api_key);
    Ok(url)
}

pub fn overview_url(base: &str, api_key: &str, date: &str) -> Result<Url> {
    let mut url = parse(base, "/lists/overview.json")?;
    {
        let mut qs = url.query_pairs_mut();
        if date != "current" {
            qs.append_pair("published_date", date);
        }
        qs.append_pair("api-key", api_key);
    }
    Ok(url)
}

pub fn list_url(base: &str, api_key: &str, date: &str, slug: &str, offset: u32) -> Result<Url> {
    let mut url = parse(base, &format!("/lists/{date}/{slug}.json"))?;
    {
        let mut qs = url.query_pairs_mut();
        if offset > 0 {
            qs.append_pair("offset", &offset.to_string());
        }
        qs.append_pair("api-key", api_key);
    }
    Ok(url)
}

fn parse(base: &str, path: &str) -> Result<Url> {
    Url::parse(&format!("{base}{path}"))
        .map_err(|e| Error::Network(format!("invalid NYT URL: {e}")))
}

pub fn normalize_list_names(body: &Value) -> Result<ListNamesPayload> {
    require_ok(body)?;
    let list_names: Vec<ListName> = body["results"]
        .as_array()
        .map(|entries| entries.iter().map(normalize_list_name).collect())
        .unwrap_or_default();
    Ok(ListNamesPayload {
        count: list_names.len(),
        list_names,
        fetched_at: fetched_at(),
    })
}

pub fn normalize_overview(requested_date: &str, body: &Value) -> Result<OverviewPayload> {
    require_ok(body)?;
    let results = &body["results"];
    let lists = results["lists"]
        .as_array()
        .map(|lists| {
            lists
                .iter()
                .map(|list| {
                    let list_name = super::string_of(list, "list_name");
                    let entries = books_of(list, &list_name);
                    OverviewList {
                        display_name: super::string_of(list, "display_name"),
                        updated: super::string_of(list, "updated"),
                        list_name,
                        entries,
                    }
                })
                .collect()
        })
        .unwrap_or_default();
    Ok(OverviewPayload {
        date: super::opt_string(results, "published_date")
            .unwrap_or_else(|| requested_date.to_string()),
        lists,
        fetched_at: fetched_at(),
    })
}

pub fn normalize_list(
    slug: &str,
    requested_date: &str,
    offset: u32,
    body: &Value,
) -> Result<ListPayload> {
    require_ok(body)?;
    let results = &body["results"];
    let list_name = super::opt_string(results, "list_name").unwrap_or_else(|| slug.to_string());
    let entries = books_of(results, &list_name);
    Ok(ListPayload {
        display_name: super::opt_string(results, "display_name")
            .unwrap_or_else(|| list_name.clone()),
        date: super::opt_string(results, "published_date")
            .unwrap_or_else(|| requested_date.to_string()),
        next_published_date: super::opt_string(results, "next_published_date"),
        previous_published_date: super::opt_string(results, "previous_published_date"),
        updated: super::opt_string(results, "updated"),
        list_name,
        offset,
        entries,
        fetched_at: fetched_at(),
    })
}

fn require_ok(body: &Value) -> Result<()> {
    if body["status"].as_str() == Some("OK") {
        Ok(())
    } else {
        Err(Error::unexpected_payload("Unexpected NYT response"))
    }
}

fn books_of(container: &Value, list_name: &str) -> Vec<BestsellerEntry> {
    container["books"]
        .as_array()
        .map(|books| {
            books
                .iter()
                .map(|b| normalize_book(list_name, b))
                .collect()
        })
        .unwrap_or_default()
}

fn normalize_list_name(entry: &Value) -> ListName {
    ListName {
        list_name: super::string_of(entry, "list_name"),
        display_name: super::string_of(entry, "display_name"),
        updated: super::string_of(entry, "updated"),
        oldest_published_date: super::string_of(entry, "oldest_published_date"),
        newest_published_date: super::string_of(entry, "newest_published_date"),
    }
}

fn normalize_book(list_name: &str, book: &Value) -> BestsellerEntry {
    BestsellerEntry {
        rank: book["rank"].as_u64().unwrap_or(0) as u32,
        title: super::string_of(book, "title"),
        author: super::string_of(book, "author"),
        description: super::opt_string(book, "description"),
        primary_isbn13: super::opt_string(book, "primary_isbn13"),
        publisher: super::opt_string(book, "publisher"),
        book_image: super::opt_string(book, "book_image"),
        list_name: list_name.to_string(),
        weeks_on_list: book["weeks_on_list"].as_u64().unwrap_or(0) as u32,
        amazon_url: super::opt_string(book, "amazon_product_url"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_list_names_url_carries_key() {
        let url = list_names_url("https://api.nytimes.com/svc/books/v3", "k123").unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.nytimes.com/svc/books/v3/lists/names.json?api-key=k123"
        );
    }

    #[test]
    fn test_overview_url_omits_published_date_for_current() {
        let base = "https://api.nytimes.com/svc/books/v3";
        let current = overview_url(base, "k", "current").unwrap();
        assert!(!current.as_str().contains("published_date"));
        let dated = overview_url(base, "k", "2024-01-04").unwrap();
        assert!(dated.as_str().contains("published_date=2024-01-04"));
    }

    #[test]
    fn test_list_url_omits_zero_offset() {
        let base = "https://api.nytimes.com/svc/books/v3";
        let no_offset = list_url(base, "k", "current", "hardcover-fiction", 0).unwrap();
        assert!(!no_offset.as_str().contains("offset"));
        let with_offset = list_url(base, "k", "current", "hardcover-fiction", 20).unwrap();
        assert!(with_offset.as_str().contains("offset=20"));
        assert!(
            with_offset
                .path()
                .ends_with("/lists/current/hardcover-fiction.json")
        );
    }

    #[test]
    fn test_non_ok_status_rejected() {
        let body = json!({"status": "ERROR", "results": []});
        assert!(normalize_list_names(&body).is_err());
    }

    #[test]
    fn test_normalize_list_names() {
        let body = json!({
            "status": "OK",
            "results": [{
                "list_name": "Hardcover Fiction",
                "display_name": "Hardcover Fiction",
                "updated": "WEEKLY",
                "oldest_published_date": "2008-06-08",
                "newest_published_date": "2024-01-04"
            }]
        });
        let payload = normalize_list_names(&body).unwrap();
        assert_eq!(payload.count, 1);
        assert_eq!(payload.list_names[0].display_name, "Hardcover Fiction");
    }

    #[test]
    fn test_normalize_book_fields() {
        let body = json!({
            "status": "OK",
            "results": {
                "list_name": "hardcover-fiction",
                "display_name": "Hardcover Fiction",
                "published_date": "2024-01-04",
                "next_published_date": "",
                "previous_published_date": "2023-12-28",
                "updated": "WEEKLY",
                "books": [{
                    "rank": 1,
                    "title": "Example",
                    "author": "A. Author",
                    "description": "A book.",
                    "primary_isbn13": "9780000000000",
                    "publisher": "Pub",
                    "book_image": "",
                    "weeks_on_list": 3,
                    "amazon_product_url": "https://amazon.example/x"
                }]
            }
        });
        let payload = normalize_list("hardcover-fiction", "current", 0, &body).unwrap();
        assert_eq!(payload.date, "2024-01-04");
        assert_eq!(payload.next_published_date, None);
        assert_eq!(payload.previous_published_date.as_deref(), Some("2023-12-28"));
        let entry = &payload.entries[0];
        assert_eq!(entry.rank, 1);
        assert_eq!(entry.book_image, None);
        assert_eq!(entry.list_name, "hardcover-fiction");
        assert_eq!(entry.amazon_url.as_deref(), Some("https://amazon.example/x"));
    }

    #[test]
    fn test_normalize_overview_falls_back_to_requested_date() {
        let body = json!({"status": "OK", "results": {"lists": []}});
        let payload = normalize_overview("current", &body).unwrap();
        assert_eq!(payload.date, "current");
        assert!(payload.lists.is_empty());
    }
}
