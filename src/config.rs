//! Engine configuration parsed from environment variables.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::transport::TransportMode;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;
pub const DEFAULT_SLOW_LOAD_MS: u64 = 5000;
pub const DEFAULT_REGEN_ZOOM_DELTA: f64 = 0.5;
pub const DEFAULT_ZOOM_END_DEBOUNCE_MS: u64 = 150;
pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_BRIDGE_CHUNK_SIZE: usize = 500;
pub const DEFAULT_GRID_SIZE: f64 = 25.0;
pub const DEFAULT_FRAME_INTERVAL_MS: u64 = 16;

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub transport: TransportMode,
    /// Slots per direction in the host/renderer channels.
    pub channel_capacity: usize,
    /// A texture load running longer than this shows the fallback.
    pub slow_load: Duration,
    /// Scene regeneration runs when the scale has moved more than this since the last one.
    pub regen_zoom_delta: f64,
    pub zoom_end_debounce: Duration,
    pub request_timeout: Duration,
    pub bridge_chunk_size: usize,
    /// Snap grid for dropped objects, in world units.
    pub grid_size: f64,
    pub frame_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            transport: TransportMode::default(),
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            slow_load: Duration::from_millis(DEFAULT_SLOW_LOAD_MS),
            regen_zoom_delta: DEFAULT_REGEN_ZOOM_DELTA,
            zoom_end_debounce: Duration::from_millis(DEFAULT_ZOOM_END_DEBOUNCE_MS),
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            bridge_chunk_size: DEFAULT_BRIDGE_CHUNK_SIZE,
            grid_size: DEFAULT_GRID_SIZE,
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
        }
    }
}

impl EngineConfig {
    /// Build config from environment variables. Unset or unparseable values
    /// fall back to defaults (the latter with a warning).
    ///
    /// - `TABLESCENE_TRANSPORT`: `isolated` (default) or `co-located`
    /// - `TABLESCENE_CHANNEL_CAPACITY`: default 1024
    /// - `TABLESCENE_SLOW_LOAD_MS`: default 5000
    /// - `TABLESCENE_REGEN_ZOOM_DELTA`: default 0.5
    /// - `TABLESCENE_ZOOM_END_DEBOUNCE_MS`: default 150
    /// - `TABLESCENE_REQUEST_TIMEOUT_MS`: default 5000
    /// - `TABLESCENE_BRIDGE_CHUNK_SIZE`: default 500
    /// - `TABLESCENE_GRID_SNAP`: default 25.0
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| match std::env::var(key) {
            Ok(value) => Some(value),
            Err(_) => None,
        })
    }

    /// Build config from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let ms = |key: &str, default: u64| Duration::from_millis(env_parse(&lookup, key, default));
        Self {
            transport: env_parse(&lookup, "TABLESCENE_TRANSPORT", TransportMode::default()),
            channel_capacity: env_parse(&lookup, "TABLESCENE_CHANNEL_CAPACITY", DEFAULT_CHANNEL_CAPACITY).max(1),
            slow_load: ms("TABLESCENE_SLOW_LOAD_MS", DEFAULT_SLOW_LOAD_MS),
            regen_zoom_delta: env_parse(&lookup, "TABLESCENE_REGEN_ZOOM_DELTA", DEFAULT_REGEN_ZOOM_DELTA),
            zoom_end_debounce: ms("TABLESCENE_ZOOM_END_DEBOUNCE_MS", DEFAULT_ZOOM_END_DEBOUNCE_MS),
            request_timeout: ms("TABLESCENE_REQUEST_TIMEOUT_MS", DEFAULT_REQUEST_TIMEOUT_MS),
            bridge_chunk_size: env_parse(&lookup, "TABLESCENE_BRIDGE_CHUNK_SIZE", DEFAULT_BRIDGE_CHUNK_SIZE).max(1),
            grid_size: env_parse(&lookup, "TABLESCENE_GRID_SNAP", DEFAULT_GRID_SIZE),
            frame_interval: Duration::from_millis(DEFAULT_FRAME_INTERVAL_MS),
        }
    }
}

fn env_parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T {
    let Some(raw) = lookup(key) else {
        return default;
    };
    match raw.trim().parse::<T>() {
        Ok(value) => value,
        Err(_) => {
            warn!(key, value = %raw, "unparseable config value; using default");
            default
        }
    }
}
