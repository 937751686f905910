//! Expiring key-value store client with Local (DashMap) and Redis modes.

use dashmap::DashMap;
use deadpool_redis::Pool;
use redis::AsyncCommands;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors surfaced by store writes. Reads never error; they degrade to a
/// miss.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to get store connection: {0}")]
    Connection(String),

    #[error("store command failed: {0}")]
    Command(String),
}

/// A locally cached entry with its own TTL.
#[derive(Clone, Debug)]
struct LocalEntry {
    data: Arc<Vec<u8>>,
    stored_at: Instant,
    ttl: Duration,
}

impl LocalEntry {
    fn new(data: Vec<u8>, ttl: Duration) -> Self {
        Self {
            data: Arc::new(data),
            stored_at: Instant::now(),
            ttl,
        }
    }

    fn is_expired(&self) -> bool {
        self.stored_at.elapsed() > self.ttl
    }
}

/// Expiring key-value store client.
///
/// ## Modes
///
/// - **Local**: single-instance mode backed by a DashMap with per-entry TTL
///   checks on read (passive expiry, like the remote store)
/// - **Redis**: shared store via `SET ... EX`; the store owns eviction
#[derive(Clone)]
pub enum CacheBackend {
    /// Single-instance: local DashMap only.
    Local(Arc<DashMap<String, LocalEntry>>),

    /// Shared store via a deadpool-redis pool.
    Redis(Pool),
}

impl CacheBackend {
    /// Create a new local-only cache backend.
    pub fn new_local() -> Self {
        CacheBackend::Local(Arc::new(DashMap::new()))
    }

    /// Create a new Redis-backed cache backend.
    pub fn new_redis(pool: Pool) -> Self {
        CacheBackend::Redis(pool)
    }

    /// Get a value from the store.
    ///
    /// Returns `None` for absent and expired keys, and for any store error
    /// (which is logged). Lookups never fail a request.
    pub async fn get(&self, key: &str) -> Option<Arc<Vec<u8>>> {
        match self {
            CacheBackend::Local(map) => {
                if let Some(entry) = map.get(key) {
                    if !entry.is_expired() {
                        return Some(Arc::clone(&entry.data));
                    }
                    drop(entry);
                    map.remove(key);
                }
                None
            }
            CacheBackend::Redis(pool) => match pool.get().await {
                Ok(mut conn) => match conn.get::<_, Option<Vec<u8>>>(key).await {
                    Ok(Some(data)) => Some(Arc::new(data)),
                    Ok(None) => None,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Redis GET error, treating as miss");
                        None
                    }
                },
                Err(e) => {
                    tracing::warn!(error = %e, "failed to get Redis connection, treating as miss");
                    None
                }
            },
        }
    }

    /// Set a value with a TTL. The write is awaited so callers can observe
    /// (and log) failures; a failed write never removes existing data.
    pub async fn set(&self, key: &str, value: Vec<u8>, ttl: Duration) -> Result<(), StoreError> {
        match self {
            CacheBackend::Local(map) => {
                map.insert(key.to_string(), LocalEntry::new(value, ttl));
                Ok(())
            }
            CacheBackend::Redis(pool) => {
                let mut conn = pool
                    .get()
                    .await
                    .map_err(|e| StoreError::Connection(e.to_string()))?;
                conn.set_ex::<_, _, ()>(key, value, ttl.as_secs())
                    .await
                    .map_err(|e| StoreError::Command(e.to_string()))?;
                tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache set");
                Ok(())
            }
        }
    }

    /// Delete a key. Failures are logged and swallowed; the key expires on
    /// its own either way.
    pub async fn delete(&self, key: &str) {
        match self {
            CacheBackend::Local(map) => {
                map.remove(key);
            }
            CacheBackend::Redis(pool) => match pool.get().await {
                Ok(mut conn) => {
                    if let Err(e) = conn.del::<_, ()>(key).await {
                        tracing::warn!(key = %key, error = %e, "Redis DEL error");
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to get Redis connection for DEL");
                }
            },
        }
    }

    /// Check whether the shared store answers a PING (for readiness checks).
    pub async fn is_store_available(&self) -> bool {
        match self {
            CacheBackend::Local(_) => true,
            CacheBackend::Redis(pool) => match pool.get().await {
                Ok(mut conn) => redis::cmd("PING")
                    .query_async::<String>(&mut conn)
                    .await
                    .map(|pong| pong == "PONG")
                    .unwrap_or(false),
                Err(_) => false,
            },
        }
    }

    /// Cache statistics (local entries only; the remote store is opaque).
    pub fn stats(&self) -> CacheStats {
        match self {
            CacheBackend::Local(map) => CacheStats {
                local_entries: map.len(),
                mode: "local",
            },
            CacheBackend::Redis(_) => CacheStats {
                local_entries: 0,
                mode: "redis",
            },
        }
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub local_entries: usize,
    pub mode: &'static str,
}
