use serde::Deserialize;
use std::time::Duration;

/// Gameplay tuning for the portal queue and the dungeon hunt.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchTuning {
    /// Players needed inside the portal before the countdown runs.
    pub quorum: usize,

    /// Portal countdown length.
    pub countdown_ms: u64,

    /// Total match length measured from the authoritative start time.
    pub match_duration_ms: u64,

    /// Opening window in which the hunter is frozen and cannot tag.
    pub headstart_ms: u64,

    /// Hunter-to-survivor distance that counts as a tag.
    pub tag_radius: f32,

    /// Delay between a winner appearing and the automatic return to the commons.
    pub auto_return_ms: u64,
}

impl MatchTuning {
    pub fn countdown(&self) -> Duration {
        Duration::from_millis(self.countdown_ms)
    }

    pub fn match_duration(&self) -> Duration {
        Duration::from_millis(self.match_duration_ms)
    }

    pub fn headstart(&self) -> Duration {
        Duration::from_millis(self.headstart_ms)
    }

    pub fn auto_return(&self) -> Duration {
        Duration::from_millis(self.auto_return_ms)
    }
}

impl Default for MatchTuning {
    fn default() -> Self {
        Self {
            quorum: 3,
            countdown_ms: 10_000,
            match_duration_ms: 120_000,
            headstart_ms: 10_000,
            tag_radius: 50.0,
            auto_return_ms: 5000,
        }
    }
}
