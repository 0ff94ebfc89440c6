//! Cache layer for employee representations.
//!
//! Values are keyed by [`CacheKey`] and expire after the backend's TTL. Two
//! backends ship here: a process-local [`InMemoryCacheBackend`] and an
//! LMDB-backed [`LmdbCacheBackend`] that survives restarts and can be shared
//! by processes on one host.

pub mod key;
pub mod lmdb_backend;
pub mod memory;
pub mod traits;

pub use key::CacheKey;
pub use lmdb_backend::{LmdbCacheBackend, LmdbCacheError};
pub use memory::InMemoryCacheBackend;
pub use traits::{CacheBackend, CacheConfig, CacheStats, CacheableEntity};
