//! Google Books proxy routes.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use futures_util::future::join_all;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use readshelf_core::Error;
use readshelf_core::types::{SearchPayload, fetched_at};

use crate::error::ApiError;
use crate::proxy::{cached_response, fetch_through_cache};
use crate::server::AppState;
use crate::upstream::google_books as upstream;

const SOURCE: &str = "Google Books";

/// Batch enrichment accepts at most this many ISBNs per request.
const MAX_BATCH_ISBNS: usize = 50;

fn require_api_key(state: &AppState) -> std::result::Result<String, ApiError> {
    state
        .config
        .google_books
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::from(Error::not_configured(SOURCE)))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    q: Option<String>,
    order_by: Option<String>,
    start_index: Option<String>,
    max_results: Option<String>,
    lang_restrict: Option<String>,
    print_type: Option<String>,
}

pub async fn search(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> std::result::Result<Response, ApiError> {
    let api_key = require_api_key(&state)?;

    let q = query.q.unwrap_or_default().trim().to_string();
    if q.is_empty() {
        return Err(Error::validation("Missing q parameter").into());
    }
    let order_by = query
        .order_by
        .unwrap_or_else(|| "relevance".to_string())
        .to_lowercase();
    if !["relevance", "newest"].contains(&order_by.as_str()) {
        return Err(Error::validation("Invalid orderBy (relevance|newest)").into());
    }
    let start_index = query
        .start_index
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(0)
        .max(0) as u32;
    let max_results = query
        .max_results
        .and_then(|s| s.trim().parse::<i64>().ok())
        .unwrap_or(20)
        .clamp(1, 40) as u32;
    let lang_restrict = query.lang_restrict.unwrap_or_default().trim().to_string();
    let print_type = query.print_type.unwrap_or_default().trim().to_string();

    let key = format!(
        "gbooks:search:{q}:{order_by}:{start_index}:{max_results}:{lang_restrict}:{print_type}"
    );
    let ttl = state.config.google_books.ttl_search();
    let producer = {
        let fetcher = state.fetcher.clone();
        let base = state.config.google_books.base_url.clone();
        async move {
            let url = upstream::search_url(
                &base,
                &api_key,
                &upstream::SearchParams {
                    query: &q,
                    order_by: &order_by,
                    start_index,
                    max_results,
                    lang_restrict: &lang_restrict,
                    print_type: &print_type,
                },
            )?;
            let body = fetcher.fetch_json(SOURCE, url).await?;
            let items: Vec<_> = body["items"]
                .as_array()
                .map(|items| items.iter().map(upstream::normalize_item).collect())
                .unwrap_or_default();
            let payload = SearchPayload {
                total_items: body["totalItems"].as_u64().unwrap_or(items.len() as u64),
                start_index,
                max_results,
                items,
                fetched_at: fetched_at(),
            };
            Ok(serde_json::to_value(payload)?)
        }
    };
    let (payload, tier) =
        fetch_through_cache(&state.cache, &state.flights, &key, ttl, producer).await?;
    Ok(cached_response(payload, tier))
}

#[derive(Deserialize)]
pub struct VolumeQuery {
    country: Option<String>,
}

pub async fn volume(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<VolumeQuery>,
) -> std::result::Result<Response, ApiError> {
    let api_key = require_api_key(&state)?;
    let id = id.trim().to_string();
    if id.is_empty() {
        return Err(Error::validation("Missing volume id").into());
    }
    let country = query.country.unwrap_or_default().trim().to_string();

    let key = format!(
        "gbooks:volume:{id}:{}",
        if country.is_empty() { "any" } else { &country }
    );
    let ttl = state.config.google_books.ttl_volume();
    let producer = {
        let fetcher = state.fetcher.clone();
        let base = state.config.google_books.base_url.clone();
        async move {
            let url = upstream::volume_url(&base, &api_key, &id, &country)?;
            let body = fetcher.fetch_json(SOURCE, url).await.map_err(|e| {
                if e.upstream_status() == Some(404) {
                    Error::upstream(404, "Volume not found", "")
                } else {
                    e
                }
            })?;
            let volume = upstream::normalize_volume(&body)
                .ok_or_else(|| Error::unexpected_payload("Unexpected Google Books response"))?;
            let mut payload = serde_json::to_value(volume)?;
            payload["fetched_at"] = json!(fetched_at());
            Ok(payload)
        }
    };
    let (payload, tier) =
        fetch_through_cache(&state.cache, &state.flights, &key, ttl, producer).await?;
    Ok(cached_response(payload, tier))
}

#[derive(Deserialize)]
pub struct EnrichQuery {
    isbns: Option<String>,
}

/// Batch ISBN enrichment. Each ISBN resolves independently through its own
/// cache key; unfetchable ISBNs map to null instead of failing the batch.
pub async fn enrich(
    State(state): State<AppState>,
    Query(query): Query<EnrichQuery>,
) -> std::result::Result<Response, ApiError> {
    let api_key = require_api_key(&state)?;
    let isbns: Vec<String> = query
        .isbns
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .take(MAX_BATCH_ISBNS)
        .map(str::to_string)
        .collect();
    if isbns.is_empty() {
        return Err(Error::validation("Provide isbns=comma,separated,isbn13").into());
    }

    let lookups = isbns.iter().map(|isbn| enrich_isbn(&state, &api_key, isbn));
    let values = join_all(lookups).await;

    let mut results = Map::new();
    for (isbn, value) in isbns.iter().zip(values) {
        results.insert(isbn.clone(), value);
    }
    Ok(Json(json!({ "count": isbns.len(), "results": results })).into_response())
}

async fn enrich_isbn(state: &AppState, api_key: &str, isbn: &str) -> Value {
    let key = format!("gbooks:isbn:{isbn}");
    let ttl = state.config.google_books.ttl_isbn();
    let producer = {
        let fetcher = state.fetcher.clone();
        let base = state.config.google_books.base_url.clone();
        let api_key = api_key.to_string();
        let isbn = isbn.to_string();
        async move {
            let url = upstream::isbn_lookup_url(&base, &api_key, &isbn)?;
            let body = fetcher.fetch_json(SOURCE, url).await?;
            let item = &body["items"][0];
            if item.is_null() {
                return Err(Error::unexpected_payload(format!(
                    "no volume found for ISBN {isbn}"
                )));
            }
            Ok(serde_json::to_value(upstream::enrichment_of(item))?)
        }
    };
    match fetch_through_cache(&state.cache, &state.flights, &key, ttl, producer).await {
        Ok((value, _)) => value,
        Err(_) => Value::Null,
    }
}
