// zone_engine_core/server/src/core/config.rs
use crate::core::constants::*;
use crate::core::error::{ServerError, ServerResult};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThreadPoolConfig {
    pub simulation_threads: usize,
}

impl Default for ThreadPoolConfig {
    fn default() -> Self {
        ThreadPoolConfig {
            simulation_threads: num_cpus::get().max(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    pub tick_rate: u64,
    pub zone_size: f32,
    pub max_visible_distance: f32,
    pub object_snap_tolerance: f32,
    /// Distance a clipped motion stops short of the obstruction it hit.
    pub motion_contact_gap: f32,
    pub max_requests_per_tick: usize,
    pub thread_pools: ThreadPoolConfig,
    pub metrics_addr: Option<SocketAddr>,
    pub map_file: Option<String>,
}

impl Default for WorldConfig {
    fn default() -> Self {
        WorldConfig {
            tick_rate: SERVER_TICK_RATE,
            zone_size: ZONE_SIZE,
            max_visible_distance: MAX_VISIBLE_DISTANCE,
            object_snap_tolerance: OBJECT_SNAP_TOLERANCE,
            motion_contact_gap: MOTION_CONTACT_GAP,
            max_requests_per_tick: MAX_REQUESTS_PER_TICK,
            thread_pools: ThreadPoolConfig::default(),
            metrics_addr: None,
            map_file: None,
        }
    }
}

impl WorldConfig {
    pub fn from_yaml_str(text: &str) -> ServerResult<Self> {
        let config: WorldConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&text)
    }

    pub fn validate(&self) -> ServerResult<()> {
        if self.tick_rate == 0 {
            return Err(ServerError::ConfigError("tick_rate must be positive".into()));
        }
        if self.zone_size != ZONE_SIZE {
            // Zone ids encode grid cells of a fixed size; a different size would break world_xz.
            return Err(ServerError::ConfigError(format!(
                "zone_size must be {} (got {})",
                ZONE_SIZE, self.zone_size
            )));
        }
        if !(self.motion_contact_gap > 0.0 && self.motion_contact_gap.is_finite()) {
            return Err(ServerError::ConfigError("motion_contact_gap must be a positive number".into()));
        }
        if !(self.max_visible_distance >= 0.0) {
            return Err(ServerError::ConfigError("max_visible_distance must be non-negative".into()));
        }
        if !(self.object_snap_tolerance >= 0.0) {
            return Err(ServerError::ConfigError("object_snap_tolerance must be non-negative".into()));
        }
        if self.thread_pools.simulation_threads == 0 {
            return Err(ServerError::ConfigError("simulation_threads must be at least 1".into()));
        }
        Ok(())
    }

    pub fn tick_duration(&self) -> std::time::Duration {
        std::time::Duration::from_millis(1000 / self.tick_rate)
    }
}

/// Per-zone tuning for spatial queries, copied out of `WorldConfig`.
#[derive(Debug, Clone, Copy)]
pub struct ZoneQueryConfig {
    pub max_visible_distance: f32,
    pub object_snap_tolerance: f32,
    pub motion_contact_gap: f32,
}

impl Default for ZoneQueryConfig {
    fn default() -> Self {
        ZoneQueryConfig {
            max_visible_distance: MAX_VISIBLE_DISTANCE,
            object_snap_tolerance: OBJECT_SNAP_TOLERANCE,
            motion_contact_gap: MOTION_CONTACT_GAP,
        }
    }
}

impl From<&WorldConfig> for ZoneQueryConfig {
    fn from(config: &WorldConfig) -> Self {
        ZoneQueryConfig {
            max_visible_distance: config.max_visible_distance,
            object_snap_tolerance: config.object_snap_tolerance,
            motion_contact_gap: config.motion_contact_gap,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = WorldConfig::from_yaml_str("tick_rate: 20\nmax_visible_distance: 500.0\n").unwrap();
        assert_eq!(config.tick_rate, 20);
        assert_eq!(config.max_visible_distance, 500.0);
        assert_eq!(config.motion_contact_gap, MOTION_CONTACT_GAP);
        assert!(config.metrics_addr.is_none());
    }

    #[test]
    fn rejects_zero_tick_rate() {
        let err = WorldConfig::from_yaml_str("tick_rate: 0\n").unwrap_err();
        assert!(matches!(err, ServerError::ConfigError(_)));
    }

    #[test]
    fn rejects_non_positive_contact_gap() {
        assert!(WorldConfig::from_yaml_str("motion_contact_gap: -1.0\n").is_err());
        assert!(WorldConfig::from_yaml_str("motion_contact_gap: 0.0\n").is_err());
    }

    #[test]
    fn rejects_foreign_zone_size() {
        assert!(WorldConfig::from_yaml_str("zone_size: 1000.0\n").is_err());
    }

    #[test]
    fn parses_metrics_address() {
        let config = WorldConfig::from_yaml_str("metrics_addr: \"127.0.0.1:9100\"\n").unwrap();
        assert_eq!(config.metrics_addr.unwrap().port(), 9100);
    }
}
