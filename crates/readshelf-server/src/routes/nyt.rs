//! NYT Best Sellers proxy routes.

use axum::{
    extract::{Query, State},
    response::Response,
};
use serde::Deserialize;
use serde_json::Value;

use readshelf_cache::CacheTier;
use readshelf_core::{Error, slug};

use crate::error::ApiError;
use crate::proxy::{cached_response, fetch_through_cache};
use crate::server::AppState;
use crate::upstream::nyt as upstream;

const SOURCE: &str = "NYT";
const LIST_NAMES_KEY: &str = "nyt:list-names";

fn require_api_key(state: &AppState) -> Result<String, ApiError> {
    state
        .config
        .nyt
        .api_key
        .clone()
        .filter(|k| !k.is_empty())
        .ok_or_else(|| ApiError::from(Error::not_configured(SOURCE)))
}

/// Accepts `current` or a real calendar date as `YYYY-MM-DD`; empty input
/// means `current`.
fn validate_date(raw: Option<&str>) -> Result<String, ApiError> {
    let date = raw.unwrap_or_default().trim().to_lowercase();
    if date.is_empty() || date == "current" {
        return Ok("current".to_string());
    }
    let valid =
        date.len() == 10 && chrono::NaiveDate::parse_from_str(&date, "%Y-%m-%d").is_ok();
    if valid {
        Ok(date)
    } else {
        Err(Error::validation("Invalid date format. Use current or YYYY-MM-DD.").into())
    }
}

fn validate_offset(raw: Option<&str>) -> Result<u32, ApiError> {
    let raw = raw.unwrap_or_default().trim();
    if raw.is_empty() {
        return Ok(0);
    }
    match raw.parse::<i64>() {
        Ok(n) if (0..=2000).contains(&n) => Ok(n as u32),
        _ => Err(Error::validation("Invalid offset.").into()),
    }
}

/// List-names catalog through the normal cache/single-flight path. Shared by
/// the route handler, slug coercion and startup warmup.
pub(crate) async fn list_names_lookup(state: &AppState) -> Result<(Value, CacheTier), ApiError> {
    let api_key = require_api_key(state)?;
    let ttl = state.config.nyt.ttl_names();
    let producer = {
        let fetcher = state.fetcher.clone();
        let base = state.config.nyt.base_url.clone();
        async move {
            let url = upstream::list_names_url(&base, &api_key)?;
            let body = fetcher.fetch_json(SOURCE, url).await?;
            let payload = upstream::normalize_list_names(&body)?;
            Ok(serde_json::to_value(payload)?)
        }
    };
    fetch_through_cache(&state.cache, &state.flights, LIST_NAMES_KEY, ttl, producer).await
}

pub(crate) async fn overview_lookup(
    state: &AppState,
    date: &str,
) -> Result<(Value, CacheTier), ApiError> {
    let api_key = require_api_key(state)?;
    let key = format!("nyt:overview:{date}");
    let ttl = state.config.nyt.ttl_overview();
    let producer = {
        let fetcher = state.fetcher.clone();
        let base = state.config.nyt.base_url.clone();
        let date = date.to_string();
        async move {
            let url = upstream::overview_url(&base, &api_key, &date)?;
            let body = fetcher.fetch_json(SOURCE, url).await?;
            let payload = upstream::normalize_overview(&date, &body)?;
            Ok(serde_json::to_value(payload)?)
        }
    };
    fetch_through_cache(&state.cache, &state.flights, &key, ttl, producer).await
}

/// Resolve a list identifier to a machine slug: alias table for slug-shaped
/// input, then slugified display text, then the cached catalog, then the
/// slugified text as-is.
async fn coerce_list_slug(state: &AppState, input: &str) -> Option<String> {
    let raw = input.trim();
    if raw.is_empty() {
        return None;
    }
    let lowered = raw.to_lowercase();
    if slug::is_slug_shaped(&lowered) {
        return Some(match slug::resolve_alias(&lowered) {
            Some(alias) => {
                tracing::debug!(from = %lowered, to = %alias, "list slug alias applied");
                alias.to_string()
            }
            None => lowered,
        });
    }

    let approx = slug::slugify_display_name(raw);
    if let Some(alias) = slug::resolve_alias(&approx) {
        tracing::debug!(from = %approx, to = %alias, "list slug alias applied");
        return Some(alias.to_string());
    }

    // Catalog lookup failures fall through to the approximate slug.
    if let Ok((catalog, _)) = list_names_lookup(state).await {
        if let Some(names) = catalog["listNames"].as_array() {
            let by_display = names.iter().find(|l| {
                l["display_name"]
                    .as_str()
                    .is_some_and(|d| d.eq_ignore_ascii_case(raw))
            });
            if let Some(found) = by_display {
                return found["list_name"].as_str().map(|s| s.to_lowercase());
            }
            let by_slug = names.iter().find(|l| {
                l["display_name"]
                    .as_str()
                    .is_some_and(|d| slug::slugify_display_name(d) == approx)
            });
            if let Some(found) = by_slug {
                return found["list_name"].as_str().map(|s| s.to_lowercase());
            }
        }
    }

    if approx.is_empty() { None } else { Some(approx) }
}

pub async fn list_names(State(state): State<AppState>) -> Result<Response, ApiError> {
    let (payload, tier) = list_names_lookup(&state).await?;
    Ok(cached_response(payload, tier))
}

#[derive(Deserialize)]
pub struct OverviewQuery {
    date: Option<String>,
}

pub async fn overview(
    State(state): State<AppState>,
    Query(query): Query<OverviewQuery>,
) -> Result<Response, ApiError> {
    require_api_key(&state)?;
    let date = validate_date(query.date.as_deref())?;
    let (payload, tier) = overview_lookup(&state, &date).await?;
    Ok(cached_response(payload, tier))
}

#[derive(Deserialize)]
pub struct ListQuery {
    name: Option<String>,
    /// Legacy alias for `name`.
    list: Option<String>,
    date: Option<String>,
    offset: Option<String>,
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response, ApiError> {
    let api_key = require_api_key(&state)?;
    let name = query
        .name
        .or(query.list)
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ApiError::from(Error::validation("Missing name parameter.")))?;

    let list_slug = coerce_list_slug(&state, &name)
        .await
        .filter(|s| slug::is_slug_shaped(s))
        .ok_or_else(|| ApiError::from(Error::validation("Invalid list name.")))?;
    let date = validate_date(query.date.as_deref())?;
    let offset = validate_offset(query.offset.as_deref())?;

    let key = format!("nyt:list:{date}:{list_slug}:{offset}");
    let ttl = state.config.nyt.ttl_list();
    let producer = {
        let fetcher = state.fetcher.clone();
        let base = state.config.nyt.base_url.clone();
        let date = date.clone();
        let list_slug = list_slug.clone();
        async move {
            let url = upstream::list_url(&base, &api_key, &date, &list_slug, offset)?;
            let body = fetcher.fetch_json(SOURCE, url).await?;
            let payload = upstream::normalize_list(&list_slug, &date, offset, &body)?;
            Ok(serde_json::to_value(payload)?)
        }
    };
    let (payload, tier) =
        fetch_through_cache(&state.cache, &state.flights, &key, ttl, producer).await?;
    Ok(cached_response(payload, tier))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routes::testing::{get_json, test_app, test_config};
    use axum::http::StatusCode;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn names_body() -> Value {
        json!({
            "status": "OK",
            "results": [
                {
                    "list_name": "hardcover-fiction",
                    "display_name": "Hardcover Fiction",
                    "updated": "WEEKLY",
                    "oldest_published_date": "2008-06-08",
                    "newest_published_date": "2024-01-04"
                },
                {
                    "list_name": "childrens-middle-grade-hardcover",
                    "display_name": "Children's Middle Grade Hardcover",
                    "updated": "WEEKLY",
                    "oldest_published_date": "2015-08-23",
                    "newest_published_date": "2024-01-04"
                }
            ]
        })
    }

    fn list_body(list_name: &str) -> Value {
        json!({
            "status": "OK",
            "results": {
                "list_name": list_name,
                "display_name": "Hardcover Fiction",
                "published_date": "2024-01-04",
                "updated": "WEEKLY",
                "books": [{
                    "rank": 1,
                    "title": "Example",
                    "author": "A. Author",
                    "primary_isbn13": "9780000000000",
                    "weeks_on_list": 3
                }]
            }
        })
    }

    #[tokio::test]
    async fn test_list_names_fresh_hit_short_circuits_upstream() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lists/names.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(names_body()))
            .expect(1)
            .mount(&server)
            .await;
        let (_, app) = test_app(test_config(&server.uri()));

        let (status, headers, body) = get_json(&app, "/api/nyt/list-names").await;
        assert_eq!(status, StatusCode::OK);
        assert!(headers.get("X-Cache").is_none());
        assert_eq!(body["count"], 2);

        // Second request is served from cache; the mock's expect(1) verifies.
        let (status, _, second) = get_json(&app, "/api/nyt/list-names").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(second["fetched_at"], body["fetched_at"]);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_missing_api_key_answers_501() {
        let mut cfg = test_config("http://unused.invalid");
        cfg.nyt.api_key = None;
        let (_, app) = test_app(cfg);

        let (status, _, body) = get_json(&app, "/api/nyt/list-names").await;
        assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
        assert_eq!(body["error"], "NYT API not configured");
    }

    #[tokio::test]
    async fn test_concurrent_requests_coalesce_to_one_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lists/names.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(names_body())
                    .set_delay(Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&server)
            .await;
        let (_, app) = test_app(test_config(&server.uri()));

        let (a, b, c) = tokio::join!(
            get_json(&app, "/api/nyt/list-names"),
            get_json(&app, "/api/nyt/list-names"),
            get_json(&app, "/api/nyt/list-names"),
        );
        assert_eq!(a.0, StatusCode::OK);
        assert_eq!(a.2, b.2);
        assert_eq!(b.2, c.2);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_stale_served_when_upstream_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lists/names.json"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;
        let (state, app) = test_app(test_config(&server.uri()));

        let old = json!({"listNames": [], "count": 0, "fetched_at": "2024-01-01T00:00:00.000Z"});
        state
            .cache
            .backend()
            .set(
                "nyt:list-names:stale",
                serde_json::to_vec(&old).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let (status, headers, body) = get_json(&app, "/api/nyt/list-names").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers.get("X-Cache").unwrap(), "STALE");
        assert_eq!(body, old);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_upstream_failure_without_stale_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lists/names.json"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(3)
            .mount(&server)
            .await;
        let (_, app) = test_app(test_config(&server.uri()));

        let (status, _, body) = get_json(&app, "/api/nyt/list-names").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["upstream"], "boom");
        server.verify().await;
    }

    #[tokio::test]
    async fn test_overview_date_validation() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lists/overview.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "OK",
                "results": {"published_date": "2024-01-04", "lists": []}
            })))
            .mount(&server)
            .await;
        let (_, app) = test_app(test_config(&server.uri()));

        let (status, _, body) = get_json(&app, "/api/nyt/overview?date=2024-13-40").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Invalid date format. Use current or YYYY-MM-DD.");

        let (status, _, _) = get_json(&app, "/api/nyt/overview?date=current").await;
        assert_eq!(status, StatusCode::OK);
        let (status, _, body) = get_json(&app, "/api/nyt/overview?date=2024-01-04").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["date"], "2024-01-04");
    }

    #[tokio::test]
    async fn test_list_offset_validation() {
        let (_, app) = test_app(test_config("http://unused.invalid"));
        for bad in ["-1", "2001", "abc"] {
            let (status, _, body) =
                get_json(&app, &format!("/api/nyt/list?name=hardcover-fiction&offset={bad}"))
                    .await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "offset={bad}");
            assert_eq!(body["error"], "Invalid offset.");
        }
    }

    #[tokio::test]
    async fn test_list_missing_name_rejected() {
        let (_, app) = test_app(test_config("http://unused.invalid"));
        let (status, _, body) = get_json(&app, "/api/nyt/list").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing name parameter.");
    }

    #[tokio::test]
    async fn test_list_slug_passthrough_and_offset() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lists/current/hardcover-fiction.json"))
            .and(query_param("offset", "20"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body("hardcover-fiction")))
            .expect(1)
            .mount(&server)
            .await;
        let (_, app) = test_app(test_config(&server.uri()));

        let (status, _, body) =
            get_json(&app, "/api/nyt/list?name=hardcover-fiction&offset=20").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["offset"], 20);
        assert_eq!(body["entries"][0]["rank"], 1);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_display_name_resolves_via_catalog() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lists/names.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(names_body()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/lists/current/hardcover-fiction.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(list_body("hardcover-fiction")))
            .expect(1)
            .mount(&server)
            .await;
        let (_, app) = test_app(test_config(&server.uri()));

        let (status, _, body) = get_json(&app, "/api/nyt/list?name=Hardcover%20Fiction").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["list_name"], "hardcover-fiction");
        server.verify().await;
    }

    #[tokio::test]
    async fn test_legacy_alias_slug_resolves() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/lists/current/childrens-middle-grade-hardcover.json",
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(list_body("childrens-middle-grade-hardcover")),
            )
            .expect(1)
            .mount(&server)
            .await;
        let (_, app) = test_app(test_config(&server.uri()));

        let (status, _, _) =
            get_json(&app, "/api/nyt/list?name=children-s-middle-grade-hardcover").await;
        assert_eq!(status, StatusCode::OK);
        server.verify().await;
    }

    #[tokio::test]
    async fn test_non_ok_upstream_status_is_502() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/lists/names.json"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "ERROR"})),
            )
            .mount(&server)
            .await;
        let (_, app) = test_app(test_config(&server.uri()));

        let (status, _, _) = get_json(&app, "/api/nyt/list-names").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_validate_date_cases() {
        assert_eq!(validate_date(None).unwrap(), "current");
        assert_eq!(validate_date(Some("")).unwrap(), "current");
        assert_eq!(validate_date(Some("Current")).unwrap(), "current");
        assert_eq!(validate_date(Some("2024-01-04")).unwrap(), "2024-01-04");
        assert!(validate_date(Some("2024-13-40")).is_err());
        assert!(validate_date(Some("2024-1-4")).is_err());
        assert!(validate_date(Some("yesterday")).is_err());
    }

    #[test]
    fn test_validate_offset_bounds() {
        assert_eq!(validate_offset(None).unwrap(), 0);
        assert_eq!(validate_offset(Some("0")).unwrap(), 0);
        assert_eq!(validate_offset(Some("2000")).unwrap(), 2000);
        assert!(validate_offset(Some("-1")).is_err());
        assert!(validate_offset(Some("2001")).is_err());
    }
}
