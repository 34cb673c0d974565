//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the
//! geo-rewrite front proxy. All types derive Serde traits for deserialization
//! from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the geo-rewrite proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GeoRewriteConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Application server that receives every (possibly rewritten) request.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Remote country mapping endpoint.
    pub mapping_source: MappingSourceConfig,

    /// Mapping cache lifetime.
    pub cache: CacheConfig,

    /// Rewrite rules.
    pub rewrite: RewriteConfig,

    /// Loop guard cookie.
    pub loop_guard: LoopGuardConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream application server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream address (e.g., "127.0.0.1:3000").
    pub address: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Timeout configuration for proxied requests.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Where and how the country mapping is fetched.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MappingSourceConfig {
    /// GraphQL endpoint of the content delivery API.
    pub endpoint: String,

    /// Static token sent with every fetch.
    pub auth_token: String,

    /// Header carrying `auth_token`.
    pub auth_header: String,

    /// Stable identifier of the content item holding the mapping.
    pub item_path: String,

    /// Field of the item whose value is the serialized mapping.
    pub field_name: String,

    /// Content language.
    pub language: String,

    /// Upper bound on a single fetch, in milliseconds.
    pub timeout_ms: u64,
}

impl MappingSourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for MappingSourceConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://edge.sitecorecloud.io/api/graphql/v1".to_string(),
            auth_token: String::new(),
            auth_header: "X-GQL-TOKEN".to_string(),
            item_path: "{91CEB4EA-3EB0-4C5D-A25D-3E6801C46A9F}".to_string(),
            field_name: "CountryMapping".to_string(),
            language: "en".to_string(),
            timeout_ms: 5_000,
        }
    }
}

/// Mapping cache configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CacheConfig {
    /// Seconds a fetched mapping stays fresh. `None` or 0 keeps it until restart.
    pub ttl_secs: Option<u64>,
}

impl CacheConfig {
    /// Effective TTL; `None` means the mapping never goes stale.
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

/// Rewrite rules applied to entry paths.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RewriteConfig {
    /// Paths eligible for country rewriting (exact match).
    pub entry_paths: Vec<String>,

    /// Prefix prepended to the resolved landing path.
    pub landing_prefix: String,

    /// Country used when the request carries no geolocation signal.
    pub fallback_country: String,

    /// Request header carrying the detected country code.
    pub country_header: String,

    /// Query parameter that receives the original request path.
    pub original_path_param: String,
}

impl Default for RewriteConfig {
    fn default() -> Self {
        Self {
            entry_paths: vec!["/".to_string(), "/home2".to_string()],
            landing_prefix: "/countryhome".to_string(),
            fallback_country: "DK".to_string(),
            country_header: "x-geo-country".to_string(),
            original_path_param: "originalPath".to_string(),
        }
    }
}

/// Loop guard cookie configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoopGuardConfig {
    /// Cookie name of the marker.
    pub cookie_name: String,

    /// Marker lifetime in seconds.
    pub ttl_secs: u64,

    /// Add the `Secure` attribute.
    pub secure: bool,
}

impl Default for LoopGuardConfig {
    fn default() -> Self {
        Self {
            cookie_name: "middleware-rewrite".to_string(),
            ttl_secs: 5 * 60,
            secure: false,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Mount `/admin/mapping` routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
