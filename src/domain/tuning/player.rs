use serde::Deserialize;
use std::time::Duration;

/// Gameplay tuning for player movement and replication smoothing.
///
/// Keep this separate from runtime configuration (store URLs, render cadence, etc.).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct PlayerTuning {
    /// Hunter speed in world units per second while alive.
    pub hunter_speed: f32,

    /// Speed of everyone else in world units per second.
    pub survivor_speed: f32,

    /// Fraction of the remaining gap a remote entity closes per fixed step.
    pub interpolation_factor: f32,

    /// Remote entities silent for longer than this are evicted.
    pub stale_timeout_ms: u64,

    /// Minimum local time between two position syncs.
    pub sync_interval_ms: u64,

    /// An idle entity still touches its row this often so observers keep it.
    /// Must stay well below `stale_timeout_ms`.
    pub heartbeat_interval_ms: u64,

    /// Remote entities closer than this to their target count as standing still.
    pub moving_epsilon: f32,
}

impl PlayerTuning {
    pub fn stale_timeout(&self) -> Duration {
        Duration::from_millis(self.stale_timeout_ms)
    }

    pub fn sync_interval(&self) -> Duration {
        Duration::from_millis(self.sync_interval_ms)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}

impl Default for PlayerTuning {
    fn default() -> Self {
        Self {
            hunter_speed: 480.0,
            survivor_speed: 360.0,
            interpolation_factor: 0.1,
            stale_timeout_ms: 5000,
            sync_interval_ms: 50,
            heartbeat_interval_ms: 2500,
            moving_epsilon: 0.5,
        }
    }
}
