//! API Configuration Module
//!
//! Server, storage, cache and CORS settings. Configuration is loaded from
//! environment variables with sensible defaults for development.

use std::path::PathBuf;
use std::time::Duration;

use roster_core::{AllowedRoles, DEFAULT_ROLES};
use roster_storage::CacheConfig;

// ============================================================================
// BACKEND SELECTION
// ============================================================================

/// Which record store the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl StoreKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(Self::Postgres),
            "memory" | "in-memory" | "inmemory" => Some(Self::Memory),
            _ => None,
        }
    }
}

/// Which cache backend holds employee representations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackendKind {
    Memory,
    Lmdb,
}

impl CacheBackendKind {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" | "inmemory" => Some(Self::Memory),
            "lmdb" => Some(Self::Lmdb),
            _ => None,
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

/// API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    // ========================================================================
    // Server
    // ========================================================================
    /// Bind address.
    pub bind: String,

    /// Listen port.
    pub port: u16,

    /// Per-request timeout.
    pub request_timeout: Duration,

    // ========================================================================
    // Storage and cache
    // ========================================================================
    pub store: StoreKind,

    pub cache_backend: CacheBackendKind,

    /// Key prefix and TTL for cached records.
    pub cache: CacheConfig,

    /// Directory for the LMDB cache environment.
    pub cache_lmdb_path: PathBuf,

    /// LMDB map size in megabytes.
    pub cache_lmdb_max_mb: usize,

    // ========================================================================
    // Validation
    // ========================================================================
    /// Role names accepted on create and full update.
    pub allowed_roles: AllowedRoles,

    // ========================================================================
    // CORS Configuration
    // ========================================================================
    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means allow all origins (dev mode).
    pub cors_origins: Vec<String>,

    /// Max age for CORS preflight cache in seconds.
    pub cors_max_age_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".to_string(),
            port: 8080,
            request_timeout: Duration::from_secs(30),

            store: StoreKind::Postgres,
            cache_backend: CacheBackendKind::Memory,
            cache: CacheConfig::default(),
            cache_lmdb_path: PathBuf::from("./data/cache"),
            cache_lmdb_max_mb: 64,

            allowed_roles: AllowedRoles::new(DEFAULT_ROLES.iter().copied()),

            cors_origins: Vec::new(), // Empty = allow all
            cors_max_age_secs: 86400, // 24 hours
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `ROSTER_API_BIND`: Bind address (default: 0.0.0.0)
    /// - `PORT` or `ROSTER_API_PORT`: Listen port (default: 8080)
    /// - `ROSTER_REQUEST_TIMEOUT_SECS`: Per-request timeout (default: 30)
    /// - `ROSTER_STORE`: "postgres" or "memory" (default: postgres)
    /// - `ROSTER_CACHE_BACKEND`: "memory" or "lmdb" (default: memory)
    /// - `ROSTER_CACHE_TTL_SECS`: Cache entry lifetime (default: 60)
    /// - `ROSTER_CACHE_PREFIX`: Cache key prefix (default: roster)
    /// - `ROSTER_CACHE_LMDB_PATH`: LMDB directory (default: ./data/cache)
    /// - `ROSTER_CACHE_LMDB_MAX_MB`: LMDB map size (default: 64)
    /// - `ROSTER_ALLOWED_ROLES`: Comma-separated role names
    /// - `ROSTER_CORS_ORIGINS`: Comma-separated allowed origins (empty = allow all)
    /// - `ROSTER_CORS_MAX_AGE_SECS`: Preflight cache duration (default: 86400)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or unparsable values fall
    /// back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let parsed = |key: &str| lookup(key).and_then(|s| s.trim().parse::<u64>().ok());

        let bind = lookup("ROSTER_API_BIND").unwrap_or(defaults.bind);

        let port = lookup("PORT")
            .or_else(|| lookup("ROSTER_API_PORT"))
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        let request_timeout = parsed("ROSTER_REQUEST_TIMEOUT_SECS")
            .map(Duration::from_secs)
            .unwrap_or(defaults.request_timeout);

        let store = lookup("ROSTER_STORE")
            .and_then(|s| StoreKind::parse(&s))
            .unwrap_or(defaults.store);

        let cache_backend = lookup("ROSTER_CACHE_BACKEND")
            .and_then(|s| CacheBackendKind::parse(&s))
            .unwrap_or(defaults.cache_backend);

        let cache = CacheConfig::new(
            lookup("ROSTER_CACHE_PREFIX")
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(defaults.cache.prefix),
            parsed("ROSTER_CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache.ttl),
        );

        let cache_lmdb_path = lookup("ROSTER_CACHE_LMDB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.cache_lmdb_path);

        let cache_lmdb_max_mb = parsed("ROSTER_CACHE_LMDB_MAX_MB")
            .and_then(|mb| usize::try_from(mb).ok())
            .unwrap_or(defaults.cache_lmdb_max_mb);

        let allowed_roles = lookup("ROSTER_ALLOWED_ROLES")
            .map(|csv| AllowedRoles::from_csv(&csv))
            .filter(|roles| !roles.is_empty())
            .unwrap_or(defaults.allowed_roles);

        let cors_origins = lookup("ROSTER_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let cors_max_age_secs =
            parsed("ROSTER_CORS_MAX_AGE_SECS").unwrap_or(defaults.cors_max_age_secs);

        Self {
            bind,
            port,
            request_timeout,
            store,
            cache_backend,
            cache,
            cache_lmdb_path,
            cache_lmdb_max_mb,
            allowed_roles,
            cors_origins,
            cors_max_age_secs,
        }
    }

    /// `bind:port` socket address string.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }

    /// Check if running in production mode (strict CORS).
    pub fn is_production(&self) -> bool {
        !self.cors_origins.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::default();
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
        assert_eq!(config.store, StoreKind::Postgres);
        assert_eq!(config.cache_backend, CacheBackendKind::Memory);
        assert_eq!(config.cache.ttl, Duration::from_secs(60));
        assert_eq!(config.cache.prefix, "roster");
        assert!(config.cors_origins.is_empty());
        assert!(!config.is_production());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("PORT", "9090"),
            ("ROSTER_STORE", "memory"),
            ("ROSTER_CACHE_BACKEND", "LMDB"),
            ("ROSTER_CACHE_TTL_SECS", "5"),
            ("ROSTER_CACHE_PREFIX", "my-redis-"),
            ("ROSTER_ALLOWED_ROLES", "JANITOR, CHEF"),
            ("ROSTER_CORS_ORIGINS", "https://a.example, ,https://b.example"),
        ]));

        assert_eq!(config.port, 9090);
        assert_eq!(config.store, StoreKind::Memory);
        assert_eq!(config.cache_backend, CacheBackendKind::Lmdb);
        assert_eq!(config.cache.ttl, Duration::from_secs(5));
        assert_eq!(config.cache.prefix, "my-redis-");
        assert_eq!(config.allowed_roles.roles().collect::<Vec<_>>(), vec!["CHEF", "JANITOR"]);
        assert_eq!(config.cors_origins.len(), 2);
        assert!(config.is_production());
    }

    #[test]
    fn test_unparsable_values_fall_back() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("PORT", "not-a-port"),
            ("ROSTER_STORE", "oracle"),
            ("ROSTER_ALLOWED_ROLES", " , "),
        ]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.store, StoreKind::Postgres);
        assert!(!config.allowed_roles.is_empty());
    }

    #[test]
    fn test_port_prefers_platform_variable() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("PORT", "7000"),
            ("ROSTER_API_PORT", "7001"),
        ]));
        assert_eq!(config.port, 7000);
    }
}
