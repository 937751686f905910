//! The cached-proxy pipeline shared by every API route.
//!
//! Order of operations: fresh cache hit short-circuits, otherwise the
//! producer runs under single-flight and writes both cache tiers, and on a
//! maskable failure the stale tier answers with an `X-Cache: STALE` header.

use std::time::Duration;

use axum::{
    Json,
    http::HeaderValue,
    response::{IntoResponse, Response},
};
use serde_json::Value;

use readshelf_cache::{CacheTier, SingleFlight, TieredCache};

use crate::error::ApiError;

/// Run one cached-proxy cycle for `key`.
///
/// The producer owns the full refresh: build the upstream URL, fetch,
/// normalize. The cache write happens here, inside the single-flight, so
/// coalesced callers trigger exactly one store write.
pub async fn fetch_through_cache<F>(
    cache: &TieredCache,
    flights: &SingleFlight<Value>,
    key: &str,
    fresh_ttl: Duration,
    producer: F,
) -> Result<(Value, CacheTier), ApiError>
where
    F: Future<Output = readshelf_core::Result<Value>> + Send + 'static,
{
    if let Some(payload) = cache.get(key).await {
        return Ok((payload, CacheTier::Fresh));
    }

    let refresh = {
        let cache = cache.clone();
        let key = key.to_string();
        async move {
            let payload = producer.await?;
            cache.set(&key, &payload, fresh_ttl).await;
            Ok(payload)
        }
    };

    match flights.run(key, refresh).await {
        Ok(payload) => Ok((payload, CacheTier::Fresh)),
        Err(err) => {
            if err.is_stale_maskable() {
                let lookup = cache.get_with_stale_fallback(key).await;
                if let Some(payload) = lookup.payload {
                    tracing::warn!(key = %key, error = %err, "serving cached payload after refresh failure");
                    return Ok((payload, lookup.tier));
                }
            }
            Err(ApiError::from(err))
        }
    }
}

/// Render a payload, marking stale-tier serves with `X-Cache: STALE`.
pub fn cached_response(payload: Value, tier: CacheTier) -> Response {
    let mut response = Json(payload).into_response();
    if tier == CacheTier::Stale {
        response
            .headers_mut()
            .insert("X-Cache", HeaderValue::from_static("STALE"));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use readshelf_cache::CacheBackend;
    use readshelf_core::Error;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn fixtures() -> (TieredCache, SingleFlight<Value>) {
        (
            TieredCache::new(CacheBackend::new_local()),
            SingleFlight::new(),
        )
    }

    #[tokio::test]
    async fn test_fresh_hit_short_circuits_producer() {
        let (cache, flights) = fixtures();
        cache.set("k", &json!({"v": 1}), Duration::from_secs(60)).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let producer = {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!({"v": 2}))
            }
        };
        let (payload, tier) =
            fetch_through_cache(&cache, &flights, "k", Duration::from_secs(60), producer)
                .await
                .unwrap();
        assert_eq!(payload, json!({"v": 1}));
        assert_eq!(tier, CacheTier::Fresh);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_miss_runs_producer_and_caches() {
        let (cache, flights) = fixtures();
        let (payload, tier) = fetch_through_cache(
            &cache,
            &flights,
            "k",
            Duration::from_secs(60),
            async { Ok(json!({"v": 7})) },
        )
        .await
        .unwrap();
        assert_eq!(payload, json!({"v": 7}));
        assert_eq!(tier, CacheTier::Fresh);
        assert_eq!(cache.get("k").await.unwrap(), json!({"v": 7}));
        // Stale shadow was written too
        assert!(cache.backend().get("k:stale").await.is_some());
    }

    #[tokio::test]
    async fn test_stale_masks_upstream_failure() {
        let (cache, flights) = fixtures();
        // Only the stale tier holds data
        cache
            .backend()
            .set(
                "k:stale",
                serde_json::to_vec(&json!({"old": true})).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let (payload, tier) = fetch_through_cache(
            &cache,
            &flights,
            "k",
            Duration::from_secs(60),
            async { Err(Error::upstream(500, "NYT upstream error 500", "")) },
        )
        .await
        .unwrap();
        assert_eq!(payload, json!({"old": true}));
        assert_eq!(tier, CacheTier::Stale);
    }

    #[tokio::test]
    async fn test_validation_error_is_never_masked() {
        let (cache, flights) = fixtures();
        cache
            .backend()
            .set(
                "k:stale",
                serde_json::to_vec(&json!({"old": true})).unwrap(),
                Duration::from_secs(60),
            )
            .await
            .unwrap();

        let err = fetch_through_cache(
            &cache,
            &flights,
            "k",
            Duration::from_secs(60),
            async { Err(Error::validation("bad input")) },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_failure_without_stale_propagates() {
        let (cache, flights) = fixtures();
        let err = fetch_through_cache(
            &cache,
            &flights,
            "k",
            Duration::from_secs(60),
            async { Err(Error::upstream(503, "NYT upstream error 503", "busy")) },
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_stale_response_carries_header() {
        let response = cached_response(json!({"v": 1}), CacheTier::Stale);
        assert_eq!(response.headers().get("X-Cache").unwrap(), "STALE");
        let response = cached_response(json!({"v": 1}), CacheTier::Fresh);
        assert!(response.headers().get("X-Cache").is_none());
    }
}
