//! Per-key coalescing of concurrent cache refreshes.
//!
//! When N concurrent requests miss on the same cache key, only the first
//! caller (the leader) runs the producer; the others attach to the same
//! in-flight future and receive a clone of its settled result. The registry
//! entry is removed when the flight settles, so a later request always
//! triggers a fresh attempt.
//!
//! The registry is process-local by design: cache writes are idempotent
//! full-value overwrites, so duplicate fetches across processes are
//! harmless.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::FutureExt;
use futures_util::future::{BoxFuture, Shared};

use readshelf_core::Error;

type FlightResult<T> = Result<T, Arc<Error>>;
type Flight<T> = Shared<BoxFuture<'static, FlightResult<T>>>;
type Registry<T> = Arc<Mutex<HashMap<String, Flight<T>>>>;

/// Deduplicates concurrent producer runs per cache key.
pub struct SingleFlight<T: Clone> {
    inflight: Registry<T>,
}

impl<T: Clone> Default for SingleFlight<T> {
    fn default() -> Self {
        Self {
            inflight: Arc::default(),
        }
    }
}

impl<T: Clone> Clone for SingleFlight<T> {
    fn clone(&self) -> Self {
        Self {
            inflight: Arc::clone(&self.inflight),
        }
    }
}

impl<T> SingleFlight<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `producer` under `key`, or attach to the flight already running
    /// for it.
    ///
    /// Errors are wrapped in `Arc` so every attached caller receives the
    /// same settled failure.
    pub async fn run<F>(&self, key: &str, producer: F) -> FlightResult<T>
    where
        F: Future<Output = readshelf_core::Result<T>> + Send + 'static,
    {
        let (flight, guard) = {
            let mut registry = self.inflight.lock().expect("in-flight registry poisoned");
            if let Some(existing) = registry.get(key) {
                tracing::debug!(key = %key, "attaching to in-flight refresh");
                (existing.clone(), None)
            } else {
                let flight: Flight<T> = producer.map(|r| r.map_err(Arc::new)).boxed().shared();
                registry.insert(key.to_string(), flight.clone());
                let guard = UnregisterOnDrop {
                    registry: Arc::clone(&self.inflight),
                    key: key.to_string(),
                };
                (flight, Some(guard))
            }
        };

        let result = flight.await;
        // The leader's guard unregisters the key here (or earlier, if the
        // leader was cancelled mid-flight).
        drop(guard);
        result
    }

    /// Number of currently registered flights.
    pub fn len(&self) -> usize {
        self.inflight.lock().expect("in-flight registry poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Removes the registry entry when the leader settles or is dropped, so the
/// "at most one flight per key" bookkeeping never leaks an entry.
struct UnregisterOnDrop<T: Clone> {
    registry: Registry<T>,
    key: String,
}

impl<T: Clone> Drop for UnregisterOnDrop<T> {
    fn drop(&mut self) {
        if let Ok(mut registry) = self.registry.lock() {
            registry.remove(&self.key);
        }
    }
}
