//! Response caching.
//!
//! Content-addressed store mapping a request fingerprint to a previously
//! computed response with an expiry time. Only deterministic requests
//! (temperature zero) are cache-eligible; the orchestrator enforces that
//! rule, this module just stores what it is given.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Fingerprint`] | Stable hash identifying a cache-eligible request |
//! | [`CacheBackend`] | Trait for entry storage |
//! | [`DiskCache`] | One JSON file per fingerprint, survives restarts |
//! | [`MemoryCache`] | Process-local backend for tests |
//! | [`ResponseCache`] | TTL enforcement, lazy eviction, statistics |

mod backend;
mod key;
mod store;

pub use backend::{CacheBackend, DiskCache, MemoryCache};
pub use key::Fingerprint;
pub use store::{CacheStats, CachedResponse, ResponseCache};
