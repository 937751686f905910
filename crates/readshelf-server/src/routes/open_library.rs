//! Open Library proxy routes. No credential gate; the API is public.

use axum::{
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;

use readshelf_core::Error;
use readshelf_core::types::OpenSearchPayload;

use crate::error::ApiError;
use crate::proxy::{cached_response, fetch_through_cache};
use crate::server::AppState;
use crate::upstream::open_library as upstream;

const SOURCE: &str = "Open Library";

#[derive(Deserialize)]
pub struct SearchQuery {
    q: Option<String>,
    page: Option<String>,
    limit: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Response, ApiError> {
    let q = query.q.unwrap_or_default().trim().to_string();
    if q.is_empty() {
        return Err(Error::validation("Missing q parameter").into());
    }
    let page = query
        .page
        .and_then(|p| p.trim().parse::<i64>().ok())
        .unwrap_or(1)
        .max(1) as u32;
    let limit = query
        .limit
        .and_then(|l| l.trim().parse::<i64>().ok())
        .unwrap_or(20)
        .clamp(1, 50) as u32;

    let key = format!("ol:search:{q}:{page}:{limit}");
    let ttl = state.config.open_library.ttl_search();
    let producer = {
        let fetcher = state.fetcher.clone();
        let base = state.config.open_library.base_url.clone();
        async move {
            let url = upstream::search_url(&base, &q, page, limit)?;
            let body = fetcher.fetch_json(SOURCE, url).await?;
            let items: Vec<_> = body["docs"]
                .as_array()
                .map(|docs| docs.iter().map(upstream::normalize_doc).collect())
                .unwrap_or_default();
            let total = body["numFound"].as_u64().unwrap_or(items.len() as u64);
            let payload = OpenSearchPayload {
                query: q,
                page,
                limit,
                total,
                total_pages: total.div_ceil(limit as u64),
                items,
                fetched_at: readshelf_core::types::fetched_at(),
            };
            Ok(serde_json::to_value(payload)?)
        }
    };
    let (payload, tier) =
        fetch_through_cache(&state.cache, &state.flights, &key, ttl, producer).await?;
    Ok(cached_response(payload, tier))
}

#[derive(Deserialize)]
pub struct BookQuery {
    isbn: Option<String>,
    olid: Option<String>,
}

pub async fn book(
    State(state): State<AppState>,
    Query(query): Query<BookQuery>,
) -> Result<Response, ApiError> {
    let isbn = query.isbn.unwrap_or_default().trim().to_string();
    let olid = query.olid.unwrap_or_default().trim().to_string();
    if isbn.is_empty() && olid.is_empty() {
        return Err(Error::validation("Provide isbn or olid").into());
    }
    let bib_key = if !isbn.is_empty() {
        format!("ISBN:{isbn}")
    } else {
        format!("OLID:{olid}")
    };

    let key = format!("ol:book:{isbn}:{olid}");
    let ttl = state.config.open_library.ttl_book();
    let producer = {
        let fetcher = state.fetcher.clone();
        let base = state.config.open_library.base_url.clone();
        async move {
            let url = upstream::book_url(&base, &bib_key)?;
            let body = fetcher.fetch_json(SOURCE, url).await?;
            let raw = &body[&bib_key];
            if raw.is_null() {
                return Err(Error::upstream(404, "Not found", ""));
            }
            Ok(serde_json::to_value(upstream::normalize_book(&bib_key, raw))?)
        }
    };
    let (payload, tier) =
        fetch_through_cache(&state.cache, &state.flights, &key, ttl, producer).await?;
    Ok(cached_response(payload, tier))
}
