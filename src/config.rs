// src/config.rs

//! Application configuration loaded from environment variables.
//!
//! This module defines all startup-time configuration for the service.
//! Configuration is validated eagerly and failures are treated as
//! deployment errors rather than recoverable runtime conditions.

use anyhow::Result;
use std::time::Duration;

// ============================================================
// Local macros (config-only, intentionally explicit)
// ============================================================

/// Reads a required environment variable.
///
/// # Behavior
/// - Fails fast if the variable is missing
/// - Produces a clear, human-readable error message
/// - Intended for startup-time configuration validation
macro_rules! required_env {
    // ---
    ($key:literal) => {
        std::env::var($key)
            .map_err(|_| anyhow::anyhow!(concat!("Missing required configuration: ", $key)))?
    };
}

/// Reads a required environment variable and parses it, failing fast on
/// either a missing or a malformed value.
macro_rules! required_env_parse {
    // ---
    ($key:literal, $ty:ty) => {{
        let raw = required_env!($key);
        raw.trim().parse::<$ty>().map_err(|e| {
            anyhow::anyhow!(concat!("Invalid configuration: ", $key, " = {:?} ({})"), raw, e)
        })?
    }};
}

/// Reads an optional environment variable and attempts to parse it.
///
/// If the variable is missing or cannot be parsed, the provided
/// default value is used. This macro is appropriate for non-critical
/// tuning parameters where fallback behavior is acceptable.
macro_rules! optional_env_parse {
    // ---
    ($key:literal, $ty:ty, $default:expr) => {
        std::env::var($key)
            .ok()
            .and_then(|v| v.parse::<$ty>().ok())
            .unwrap_or($default)
    };
}

#[cfg(test)]
/// Asserts that a configuration constructor fails due to a missing
/// required environment variable.
macro_rules! assert_missing_config {
    // ---
    ($expr:expr, $key:literal) => {{
        let err = $expr.expect_err("expected configuration error");
        assert!(
            err.to_string()
                .contains(concat!("Missing required configuration: ", $key)),
            "unexpected error: {err}"
        );
    }};
}

// ============================================================
// Public configuration facade
// ============================================================

/// Aggregated application configuration.
///
/// This is the single source of truth for startup configuration.
/// All required configuration is validated eagerly during initialization.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub geofence: geofence::GeofenceConfig,
    pub geolocation: geolocation::GeolocationConfig,
    pub store: store::StoreConfig,
    pub checkin: checkin::CheckInConfig,
    pub wallet: wallet::WalletConfig,
    pub server: server::ServerConfig,
}

impl AppConfig {
    /// Loads and validates all application configuration from the environment.
    ///
    /// # Errors
    /// Returns an error if any required configuration is missing or invalid.
    /// This function is intended to be called exactly once at startup.
    pub fn from_env() -> Result<Self> {
        // ---
        Ok(Self {
            geofence: geofence::GeofenceConfig::from_env()?,
            geolocation: geolocation::GeolocationConfig::from_env()?,
            store: store::StoreConfig::from_env()?,
            checkin: checkin::CheckInConfig::from_env()?,
            wallet: wallet::WalletConfig::from_env()?,
            server: server::ServerConfig::from_env()?,
        })
    }
}

// ============================================================
// Geofence configuration
// ============================================================

mod geofence {
    // ---
    use super::*;
    use crate::domain::GeoPoint;

    /// The allowed location and radius.
    ///
    /// The reference point has no sensible default and must be provided.
    #[derive(Debug, Clone)]
    pub struct GeofenceConfig {
        /// Reference point check-ins are measured against.
        pub reference: GeoPoint,

        /// Inclusive acceptance radius in kilometres. Defaults to 10.
        pub max_distance_km: f64,
    }

    impl GeofenceConfig {
        /// Builds a [`GeofenceConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error if the reference point is missing or out of range.
        pub fn from_env() -> Result<Self> {
            // ---
            let latitude = required_env_parse!("ATTEND_GEOFENCE_LAT", f64);
            let longitude = required_env_parse!("ATTEND_GEOFENCE_LON", f64);
            let max_distance_km = optional_env_parse!("ATTEND_MAX_DISTANCE_KM", f64, 10.0);

            if !max_distance_km.is_finite() || max_distance_km < 0.0 {
                anyhow::bail!("Invalid configuration: ATTEND_MAX_DISTANCE_KM = {max_distance_km}");
            }

            Ok(Self {
                reference: GeoPoint::new(latitude, longitude)?,
                max_distance_km,
            })
        }
    }
}
pub use geofence::GeofenceConfig;

// ============================================================
// Geolocation configuration
// ============================================================

mod geolocation {
    // ---
    use super::*;
    use crate::domain::PositionOptions;

    /// Options for position fixes and the optional server-side fallback source.
    #[derive(Debug, Clone)]
    pub struct GeolocationConfig {
        /// Options passed to every fix. Defaults: high accuracy, 10 s timeout, no caching.
        pub options: PositionOptions,

        /// Location service used when a request carries no reported fix.
        pub provider_url: Option<String>,
    }

    impl GeolocationConfig {
        /// Builds a [`GeolocationConfig`] from environment variables.
        pub fn from_env() -> Result<Self> {
            // ---
            let timeout_ms = optional_env_parse!("ATTEND_GEO_TIMEOUT_MS", u64, 10_000);
            let max_age_ms = optional_env_parse!("ATTEND_GEO_MAX_AGE_MS", u64, 0);
            let enable_high_accuracy = optional_env_parse!("ATTEND_GEO_HIGH_ACCURACY", bool, true);
            let provider_url = std::env::var("ATTEND_GEO_PROVIDER_URL")
                .ok()
                .filter(|url| !url.trim().is_empty());

            Ok(Self {
                options: PositionOptions {
                    enable_high_accuracy,
                    timeout: Duration::from_millis(timeout_ms),
                    maximum_age: Duration::from_millis(max_age_ms),
                },
                provider_url,
            })
        }
    }
}
pub use geolocation::GeolocationConfig;

// ============================================================
// Store configuration
// ============================================================

mod store {
    // ---
    use super::*;

    /// Backend behind the record store.
    #[derive(Debug, Clone, PartialEq)]
    pub enum StoreBackend {
        /// Process-local map. Records are lost on restart.
        Memory,
        /// Redis at the given connection string.
        Redis { url: String },
    }

    /// Record store configuration.
    #[derive(Debug, Clone)]
    pub struct StoreConfig {
        pub backend: StoreBackend,
    }

    impl StoreConfig {
        /// Builds a [`StoreConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error for an unknown backend, or when the Redis backend
        /// is selected without `ATTEND_REDIS_URL`.
        pub fn from_env() -> Result<Self> {
            // ---
            let kind = std::env::var("ATTEND_STORE").unwrap_or_else(|_| "memory".to_string());

            let backend = match kind.to_ascii_lowercase().as_str() {
                "memory" => StoreBackend::Memory,
                "redis" => StoreBackend::Redis {
                    url: required_env!("ATTEND_REDIS_URL"),
                },
                other => anyhow::bail!("Invalid configuration: ATTEND_STORE = {other:?}"),
            };

            Ok(Self { backend })
        }
    }
}
pub use store::{StoreBackend, StoreConfig};

// ============================================================
// Check-in configuration
// ============================================================

mod checkin {
    // ---
    use super::*;
    use crate::attendance::KeyScope;

    /// Rules applied to each submission.
    #[derive(Debug, Clone)]
    pub struct CheckInConfig {
        /// Lifetime of a daily key. Defaults to one key per service run.
        pub key_scope: KeyScope,

        /// Whether a wallet address is mandatory. Defaults to true.
        pub require_wallet: bool,

        /// Artificial delay before a submission is processed. Defaults to none.
        pub submit_delay: Duration,
    }

    impl CheckInConfig {
        /// Builds a [`CheckInConfig`] from environment variables.
        ///
        /// # Errors
        /// Returns an error for an unknown key scope.
        pub fn from_env() -> Result<Self> {
            // ---
            let key_scope = match std::env::var("ATTEND_DAILY_KEY_SCOPE") {
                Ok(raw) => raw.parse::<KeyScope>()?,
                Err(_) => KeyScope::Session,
            };
            let require_wallet = optional_env_parse!("ATTEND_REQUIRE_WALLET", bool, true);
            let delay_ms = optional_env_parse!("ATTEND_SUBMIT_DELAY_MS", u64, 0);

            Ok(Self {
                key_scope,
                require_wallet,
                submit_delay: Duration::from_millis(delay_ms),
            })
        }
    }
}
pub use checkin::CheckInConfig;

// ============================================================
// Wallet configuration
// ============================================================

mod wallet {
    // ---
    use super::*;

    /// Wallet provider endpoint. Without one, wallet connect fails with "not found".
    #[derive(Debug, Clone)]
    pub struct WalletConfig {
        /// JSON-RPC endpoint of the wallet bridge or node.
        pub rpc_url: Option<String>,

        /// How often account and chain changes are polled. Defaults to 4 seconds.
        pub poll_interval: Duration,
    }

    impl WalletConfig {
        /// Builds a [`WalletConfig`] from environment variables.
        pub fn from_env() -> Result<Self> {
            // ---
            let rpc_url = std::env::var("ATTEND_WALLET_RPC_URL")
                .ok()
                .filter(|url| !url.trim().is_empty());
            let poll_ms = optional_env_parse!("ATTEND_WALLET_POLL_MS", u64, 4_000);

            Ok(Self {
                rpc_url,
                poll_interval: Duration::from_millis(poll_ms.max(1)),
            })
        }
    }
}
pub use wallet::WalletConfig;

// ============================================================
// Server configuration
// ============================================================

mod server {
    // ---
    use super::*;

    /// Metrics backend selection.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum MetricsType {
        Prometheus,
        Noop,
    }

    /// Listener and observability settings.
    #[derive(Debug, Clone)]
    pub struct ServerConfig {
        /// Address the HTTP listener binds. Defaults to 127.0.0.1:8080.
        pub bind_addr: String,

        /// `prom` selects Prometheus; anything else is no-op.
        pub metrics: MetricsType,
    }

    impl ServerConfig {
        /// Builds a [`ServerConfig`] from environment variables.
        pub fn from_env() -> Result<Self> {
            // ---
            let bind_addr =
                std::env::var("API_BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:8080".to_string());
            let metrics = match std::env::var("AXUM_METRICS_TYPE").as_deref() {
                Ok("prom") => MetricsType::Prometheus,
                _ => MetricsType::Noop,
            };

            Ok(Self { bind_addr, metrics })
        }
    }
}
pub use server::{MetricsType, ServerConfig};

// ============================================================
// Tests
// ============================================================
