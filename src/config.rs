use std::{path::Path, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

const DEFAULT_CONFIG_PATH: &str = "config/app.json";
const CONFIG_PATH_ENV: &str = "QUEUEFLOW_CONFIG_PATH";

const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
const DEFAULT_HEALTH_POLL_INTERVAL_MS: u64 = 5_000;
const DEFAULT_MAX_COUNT: u32 = 99;
const DEFAULT_SSE_CAPACITY: usize = 16;

/// Runtime configuration shared by every service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// How often each synchronizer polls the store for the latest call.
    pub poll_interval: Duration,
    /// How often the storage supervisor pings the store.
    pub health_poll_interval: Duration,
    /// Ticket ceiling applied to organizations created on first access.
    pub default_max_count: u32,
    /// Broadcast capacity of each organization's SSE hub.
    pub sse_capacity: usize,
}

/// On-disk shape of the configuration file; every field is optional and
/// falls back to a baked-in default.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    poll_interval_ms: Option<u64>,
    health_poll_interval_ms: Option<u64>,
    default_max_count: Option<u32>,
    sse_capacity: Option<usize>,
}

impl AppConfig {
    /// Load the configuration from `config/app.json`, or from the path given
    /// by `QUEUEFLOW_CONFIG_PATH`. A missing or unreadable file falls back to
    /// the defaults so the service can always start.
    pub fn load() -> Self {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let raw = read_raw(Path::new(&path));
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Self {
        let default_max_count = raw.default_max_count.unwrap_or(DEFAULT_MAX_COUNT);
        if default_max_count == 0 {
            warn!("default_max_count of 0 is not usable; clamping to 1");
        }
        Self {
            poll_interval: Duration::from_millis(
                raw.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS),
            ),
            health_poll_interval: Duration::from_millis(
                raw.health_poll_interval_ms
                    .unwrap_or(DEFAULT_HEALTH_POLL_INTERVAL_MS),
            ),
            default_max_count: default_max_count.max(1),
            sse_capacity: raw.sse_capacity.unwrap_or(DEFAULT_SSE_CAPACITY),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self::from_raw(RawConfig::default())
    }
}

fn read_raw(path: &Path) -> RawConfig {
    match std::fs::read_to_string(path) {
        Ok(content) => match serde_json::from_str(&content) {
            Ok(raw) => {
                info!(path = %path.display(), "loaded configuration file");
                raw
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "invalid configuration file; using defaults");
                RawConfig::default()
            }
        },
        Err(err) => {
            info!(path = %path.display(), error = %err, "no configuration file; using defaults");
            RawConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let config = AppConfig::from_raw(RawConfig::default());
        assert_eq!(config.poll_interval, Duration::from_millis(2_000));
        assert_eq!(config.health_poll_interval, Duration::from_millis(5_000));
        assert_eq!(config.default_max_count, 99);
        assert_eq!(config.sse_capacity, 16);
    }

    #[test]
    fn zero_max_count_is_clamped() {
        let raw = RawConfig {
            default_max_count: Some(0),
            ..RawConfig::default()
        };
        assert_eq!(AppConfig::from_raw(raw).default_max_count, 1);
    }

    #[test]
    fn explicit_values_override_defaults() {
        let raw: RawConfig = serde_json::from_str(
            r#"{"poll_interval_ms": 500, "health_poll_interval_ms": 1000, "default_max_count": 30}"#,
        )
        .unwrap();
        let config = AppConfig::from_raw(raw);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.health_poll_interval, Duration::from_millis(1_000));
        assert_eq!(config.default_max_count, 30);
        assert_eq!(config.sse_capacity, 16);
    }
}
