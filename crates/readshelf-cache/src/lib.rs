//! Caching layer for the Readshelf proxy routes.
//!
//! ## Architecture
//!
//! - [`CacheBackend`]: thin async get/set/delete client over an expiring
//!   key-value store (Redis, with a local in-process mode for
//!   single-instance deployments and tests)
//! - [`TieredCache`]: JSON fresh/stale two-tier cache. Every write lands
//!   under its key with the fresh TTL and under a `:stale` shadow key with a
//!   much longer TTL, enabling serve-stale-on-upstream-failure
//! - [`SingleFlight`]: per-key coalescing so N concurrent refreshes of the
//!   same cache key issue exactly one upstream fetch
//!
//! ## Degradation rules
//!
//! Store errors on read are a cache miss, never a request failure. Store
//! errors on write are logged and swallowed; the freshly fetched payload is
//! still valid to return once.

pub mod backend;
pub mod single_flight;
pub mod tiered;

pub use backend::{CacheBackend, CacheStats, StoreError};
pub use single_flight::SingleFlight;
pub use tiered::{CacheTier, Lookup, TieredCache};
