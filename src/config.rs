//! Hub configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Unset or unparsable numeric values fall back to defaults;
//! only an unparsable `LISTEN_ADDR` is fatal.

use std::net::SocketAddr;
use std::time::Duration;

use crate::domain::ClientId;
use crate::hub::DEFAULT_QUEUE_CAPACITY;

/// Top-level hub configuration.
///
/// Loaded once at startup via [`HubConfig::from_env`].
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Frames buffered per client before new events are dropped.
    pub client_queue_capacity: usize,

    /// Whether to run the heartbeat task.
    pub heartbeat_enabled: bool,

    /// Period between heartbeat events.
    pub heartbeat_interval: Duration,

    /// Client to ping. `None` broadcasts the heartbeat to everyone.
    pub heartbeat_target: Option<ClientId>,

    /// Reconnect hint sent as the first frame of every stream.
    pub default_retry_ms: Option<u64>,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            client_queue_capacity: DEFAULT_QUEUE_CAPACITY,
            heartbeat_enabled: true,
            heartbeat_interval: Duration::from_secs(5),
            heartbeat_target: None,
            default_retry_ms: None,
        }
    }
}

impl HubConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        let defaults = Self::default();

        let listen_addr = match std::env::var("LISTEN_ADDR") {
            Ok(raw) => raw.parse()?,
            Err(_) => defaults.listen_addr,
        };

        let client_queue_capacity =
            parse_env("CLIENT_QUEUE_CAPACITY", defaults.client_queue_capacity).max(1);
        let heartbeat_enabled = parse_env_bool("HEARTBEAT_ENABLED", defaults.heartbeat_enabled);
        let heartbeat_secs = parse_env("HEARTBEAT_INTERVAL_SECS", 5u64).max(1);
        let heartbeat_target = std::env::var("HEARTBEAT_TARGET")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(ClientId::from);
        let default_retry_ms = std::env::var("DEFAULT_RETRY_MS")
            .ok()
            .and_then(|v| v.parse().ok());

        Ok(Self {
            listen_addr,
            client_queue_capacity,
            heartbeat_enabled,
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
            heartbeat_target,
            default_retry_ms,
        })
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Parses an environment variable as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key).ok().map(|v| v.to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
