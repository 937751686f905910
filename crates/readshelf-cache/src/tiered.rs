//! Fresh/stale two-tier JSON cache.
//!
//! ## Key scheme
//!
//! Every payload is written twice: under `key` with the route's fresh TTL and
//! under `key:stale` with a fixed, much longer TTL (default 24 hours). A
//! fresh hit is served without revalidation; the stale copy exists only to be
//! served when a refresh fails.

use std::time::Duration;

use serde_json::Value;

use crate::backend::CacheBackend;

/// Default lifetime of the `:stale` shadow copy.
pub const DEFAULT_STALE_TTL: Duration = Duration::from_secs(24 * 3600);

/// Which tier served a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Fresh,
    Stale,
    Miss,
}

/// Result of a two-tier lookup.
#[derive(Debug, Clone)]
pub struct Lookup {
    pub payload: Option<Value>,
    pub tier: CacheTier,
}

impl Lookup {
    fn miss() -> Self {
        Self {
            payload: None,
            tier: CacheTier::Miss,
        }
    }

    pub fn is_fresh(&self) -> bool {
        self.tier == CacheTier::Fresh
    }
}

/// JSON cache with a stale shadow tier over a [`CacheBackend`].
#[derive(Clone)]
pub struct TieredCache {
    backend: CacheBackend,
    stale_ttl: Duration,
}

impl TieredCache {
    pub fn new(backend: CacheBackend) -> Self {
        Self {
            backend,
            stale_ttl: DEFAULT_STALE_TTL,
        }
    }

    /// Override the stale TTL (tests mostly).
    pub fn with_stale_ttl(mut self, stale_ttl: Duration) -> Self {
        self.stale_ttl = stale_ttl;
        self
    }

    pub fn backend(&self) -> &CacheBackend {
        &self.backend
    }

    fn stale_key(key: &str) -> String {
        format!("{key}:stale")
    }

    /// Get the fresh payload for `key`, if present and unexpired.
    pub async fn get(&self, key: &str) -> Option<Value> {
        self.decode(key, self.backend.get(key).await?).await
    }

    /// Look up the fresh tier, then the stale tier, reporting which one
    /// served.
    pub async fn get_with_stale_fallback(&self, key: &str) -> Lookup {
        if let Some(payload) = self.get(key).await {
            return Lookup {
                payload: Some(payload),
                tier: CacheTier::Fresh,
            };
        }
        let stale_key = Self::stale_key(key);
        if let Some(payload) = self.get(&stale_key).await {
            return Lookup {
                payload: Some(payload),
                tier: CacheTier::Stale,
            };
        }
        Lookup::miss()
    }

    /// Write `payload` through both tiers, extending both horizons from now.
    ///
    /// Both writes are always attempted; a failure on either is logged and
    /// does not affect the other key. The stale horizon never undercuts the
    /// fresh one.
    pub async fn set(&self, key: &str, payload: &Value, fresh_ttl: Duration) {
        let encoded = match serde_json::to_vec(payload) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "failed to encode payload for cache");
                return;
            }
        };

        if let Err(e) = self.backend.set(key, encoded.clone(), fresh_ttl).await {
            tracing::warn!(key = %key, error = %e, "fresh cache write failed");
        }

        let stale_ttl = self.stale_ttl.max(fresh_ttl);
        let stale_key = Self::stale_key(key);
        if let Err(e) = self.backend.set(&stale_key, encoded, stale_ttl).await {
            tracing::warn!(key = %stale_key, error = %e, "stale cache write failed");
        }
    }

    /// Decode stored bytes; a corrupt entry is deleted and treated as a miss.
    async fn decode(&self, key: &str, data: std::sync::Arc<Vec<u8>>) -> Option<Value> {
        match serde_json::from_slice(&data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "corrupt cache entry, discarding");
                self.backend.delete(key).await;
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cache() -> TieredCache {
        TieredCache::new(CacheBackend::new_local())
    }

    #[tokio::test]
    async fn test_fresh_hit() {
        let cache = cache();
        let payload = json!({"lists": [], "fetched_at": "2024-01-04T00:00:00.000Z"});
        cache.set("nyt:overview:current", &payload, Duration::from_secs(60)).await;

        let lookup = cache.get_with_stale_fallback("nyt:overview:current").await;
        assert_eq!(lookup.tier, CacheTier::Fresh);
        assert_eq!(lookup.payload.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_miss_reports_miss() {
        let lookup = cache().get_with_stale_fallback("absent").await;
        assert_eq!(lookup.tier, CacheTier::Miss);
        assert!(lookup.payload.is_none());
    }

    #[tokio::test]
    async fn test_stale_serves_after_fresh_expiry() {
        let cache = cache();
        let payload = json!({"rank": 1});
        cache.set("k", &payload, Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;

        assert!(cache.get("k").await.is_none());
        let lookup = cache.get_with_stale_fallback("k").await;
        assert_eq!(lookup.tier, CacheTier::Stale);
        assert_eq!(lookup.payload.unwrap(), payload);
    }

    #[tokio::test]
    async fn test_refresh_extends_both_horizons() {
        let cache = cache();
        cache.set("k", &json!(1), Duration::from_millis(10)).await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        cache.set("k", &json!(2), Duration::from_secs(60)).await;

        let lookup = cache.get_with_stale_fallback("k").await;
        assert_eq!(lookup.tier, CacheTier::Fresh);
        assert_eq!(lookup.payload.unwrap(), json!(2));
    }

    #[tokio::test]
    async fn test_stale_ttl_never_undercuts_fresh() {
        let cache = cache().with_stale_ttl(Duration::from_millis(1));
        cache.set("k", &json!("v"), Duration::from_secs(60)).await;

        // The stale write is clamped up to the fresh TTL, so the shadow key
        // is still live well past the configured 1ms stale TTL.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(cache.backend().get("k:stale").await.is_some());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let cache = cache();
        cache
            .backend()
            .set("k", b"{not json".to_vec(), Duration::from_secs(60))
            .await
            .unwrap();

        assert!(cache.get("k").await.is_none());
        // The corrupt key was discarded entirely.
        assert!(cache.backend().get("k").await.is_none());
    }

    #[tokio::test]
    async fn test_cached_payload_replays_byte_identical() {
        let cache = cache();
        let payload = json!({
            "rank": 1,
            "title": "Example",
            "author": "A. Author",
            "primary_isbn13": "9780000000000",
            "weeks_on_list": 3
        });
        let first = serde_json::to_vec(&payload).unwrap();
        cache.set("k", &payload, Duration::from_secs(60)).await;

        let read_back = cache.get("k").await.unwrap();
        assert_eq!(serde_json::to_vec(&read_back).unwrap(), first);
    }
}
