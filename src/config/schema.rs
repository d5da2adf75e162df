//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration for the event API.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Conditional-GET caching configuration.
    pub cache: CacheConfig,

    /// Token issuance settings.
    pub auth: AuthConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// Dataset import settings.
    pub dataset: DatasetConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Rate limiting configuration.
///
/// Two tiers: a strict one for requests under `login_path` and a general one
/// for everything else.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting (env: `RATE_LIMIT_ENABLED`).
    pub enabled: bool,

    /// Trailing window length in seconds.
    pub window_secs: u64,

    /// Requests allowed per window for general routes.
    pub general_limit: usize,

    /// Requests allowed per window for the login route.
    pub auth_limit: usize,

    /// Path prefix that selects the strict tier.
    pub login_path: String,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            window_secs: 60,
            general_limit: 120,
            auth_limit: 10,
            login_path: "/auth/login".to_string(),
        }
    }
}

/// Conditional-GET configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path prefixes eligible for ETag validation.
    pub cacheable_prefixes: Vec<String>,

    /// Largest body (bytes) the layer will buffer for hashing.
    pub max_buffered_bytes: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cacheable_prefixes: vec!["/events".to_string()],
            max_buffered_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Bearer token settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Lifetime of issued access tokens in seconds.
    pub token_ttl_secs: u64,

    /// Argon2id memory cost in KiB.
    pub password_memory_kib: u32,

    /// Argon2id iteration count.
    pub password_time_cost: u32,

    /// Accounts that receive the admin flag when they register.
    pub admin_usernames: Vec<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: 30 * 60,
            password_memory_kib: 19 * 1024,
            password_time_cost: 2,
            admin_usernames: Vec::new(),
        }
    }
}

/// Timeout configuration.
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

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Log output format (env: `LOG_FORMAT`).
    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Metrics listener address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "event_api=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Dataset import configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Directory the admin import endpoint may read CSV files from.
    pub import_dir: String,

    /// File imported when the endpoint is called without `file`.
    pub default_file: String,

    /// Name recorded as the data source of every import.
    pub source_name: String,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            import_dir: "data".to_string(),
            default_file: "events.csv".to_string(),
            source_name: "Local events CSV".to_string(),
        }
    }
}
