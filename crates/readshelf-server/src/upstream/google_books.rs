//! Google Books API URL builders and volume normalizers.

use serde_json::Value;
use url::Url;

use readshelf_core::types::{IdentifierPair, Volume, VolumeAccessInfo, VolumeEnrichment};
use readshelf_core::{Error, Result};

/// Preference order for volume cover images, best first.
const IMAGE_SIZES: [&str; 6] = [
    "extraLarge",
    "large",
    "medium",
    "small",
    "thumbnail",
    "smallThumbnail",
];

pub struct SearchParams<'a> {
    pub query: &'a str,
    pub order_by: &'a str,
    pub start_index: u32,
    pub max_results: u32,
    pub lang_restrict: &'a str,
    pub print_type: &'a str,
}

pub fn search_url(base: &str, api_key: &str, params: &SearchParams<'_>) -> Result<Url> {
    let mut url = parse(base, "/volumes")?;
    {
        let mut qs = url.query_pairs_mut();
        qs.append_pair("q", params.query);
        qs.append_pair("orderBy", params.order_by);
        qs.append_pair("startIndex", &params.start_index.to_string());
        qs.append_pair("maxResults", &params.max_results.to_string());
        // Lite projection keeps list payloads small
        qs.append_pair("projection", "lite");
        qs.append_pair("key", api_key);
        if !params.lang_restrict.is_empty() {
            qs.append_pair("langRestrict", params.lang_restrict);
        }
        if !params.print_type.is_empty() {
            qs.append_pair("printType", params.print_type);
        }
    }
    Ok(url)
}

pub fn volume_url(base: &str, api_key: &str, id: &str, country: &str) -> Result<Url> {
    let mut url = parse(base, &format!("/volumes/{}", urlencoding::encode(id)))?;
    {
        let mut qs = url.query_pairs_mut();
        qs.append_pair("projection", "full");
        qs.append_pair("key", api_key);
        if !country.is_empty() {
            qs.append_pair("country", country);
        }
    }
    Ok(url)
}

/// Single-ISBN lookup; the volumes API has no multi-ISBN batch endpoint.
pub fn isbn_lookup_url(base: &str, api_key: &str, isbn: &str) -> Result<Url> {
    let mut url = parse(base, "/volumes")?;
    url.query_pairs_mut()
        .append_pair("q", &format!("isbn:{isbn}"))
        .append_pair("maxResults", "1")
        .append_pair("key", api_key);
    Ok(url)
}

fn parse(base: &str, path: &str) -> Result<Url> {
    Url::parse(&format!("{base}{path}"))
        .map_err(|e| Error::Network(format!("invalid Google Books URL: {e}")))
}

/// Normalize one search-result item (lite projection, no access info).
pub fn normalize_item(item: &Value) -> Volume {
    let info = &item["volumeInfo"];
    let identifiers = identifier_pair(info);
    let thumbnail = best_image(&info["imageLinks"])
        .or_else(|| identifiers.isbn13.as_deref().map(open_library_cover));
    Volume {
        id: super::string_of(item, "id"),
        title: super::opt_string(info, "title").unwrap_or_else(|| "Untitled".to_string()),
        subtitle: super::opt_string(info, "subtitle"),
        authors: super::string_array(info, "authors"),
        description: super::opt_string(info, "description"),
        categories: super::string_array(info, "categories"),
        thumbnail,
        preview_link: super::opt_string(info, "previewLink"),
        info_link: super::opt_string(info, "infoLink"),
        publisher: super::opt_string(info, "publisher"),
        published_date: super::opt_string(info, "publishedDate"),
        page_count: page_count(info),
        language: super::opt_string(info, "language"),
        industry_identifiers: identifiers,
        access_info: None,
    }
}

/// Normalize a full volume record; `None` when the body has no id.
pub fn normalize_volume(body: &Value) -> Option<Volume> {
    body["id"].as_str().filter(|id| !id.is_empty())?;
    let mut volume = normalize_item(body);
    let access = &body["accessInfo"];
    volume.access_info = Some(VolumeAccessInfo {
        viewability: super::opt_string(access, "viewability"),
        embeddable: access["embeddable"].as_bool().unwrap_or(false),
        public_domain: access["publicDomain"].as_bool().unwrap_or(false),
        web_reader_link: super::opt_string(access, "webReaderLink"),
        country: super::opt_string(access, "country"),
    });
    Some(volume)
}

/// Extract the lightweight enrichment record from a search item.
pub fn enrichment_of(item: &Value) -> VolumeEnrichment {
    let info = &item["volumeInfo"];
    VolumeEnrichment {
        preview_link: super::opt_string(info, "previewLink"),
        thumbnail: best_image(&info["imageLinks"]),
        categories: super::string_array(info, "categories"),
        page_count: page_count(info),
    }
}

fn page_count(info: &Value) -> Option<u32> {
    info["pageCount"].as_u64().filter(|n| *n > 0).map(|n| n as u32)
}

fn best_image(image_links: &Value) -> Option<String> {
    IMAGE_SIZES
        .iter()
        .find_map(|size| super::opt_string(image_links, size))
}

fn open_library_cover(isbn13: &str) -> String {
    format!("https://covers.openlibrary.org/b/isbn/{isbn13}-L.jpg")
}

fn identifier_pair(info: &Value) -> IdentifierPair {
    let mut pair = IdentifierPair::default();
    if let Some(ids) = info["industryIdentifiers"].as_array() {
        for id in ids {
            match id["type"].as_str() {
                Some("ISBN_10") => pair.isbn10 = super::opt_string(id, "identifier"),
                Some("ISBN_13") => pair.isbn13 = super::opt_string(id, "identifier"),
                _ => {}
            }
        }
    }
    pair
}
