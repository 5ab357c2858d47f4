// Replicated match record plus the two locally-speculated portal fields.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Hunter,
    Survivors,
}

#[derive(Debug, Clone)]
pub struct MatchState {
    // Local-only portal bookkeeping.
    pub portal_population: usize,
    pub countdown_remaining: Duration,
    pub is_starting: bool,

    // Mirrors of the authoritative match record (epoch millis).
    pub match_start_time: Option<u64>,
    pub match_end_time: Option<u64>,
    pub is_active: bool,
    pub winner: Option<Winner>,
}

impl MatchState {
    pub fn new(countdown: Duration) -> Self {
        Self {
            portal_population: 0,
            countdown_remaining: countdown,
            is_starting: false,
            match_start_time: None,
            match_end_time: None,
            is_active: false,
            winner: None,
        }
    }

    pub fn reset_countdown(&mut self, countdown: Duration) {
        self.countdown_remaining = countdown;
        self.is_starting = false;
    }

    /// True while the match is younger than `headstart`.
    pub fn in_headstart(&self, now_ms: u64, headstart: Duration) -> bool {
        match self.match_start_time {
            Some(start) => now_ms.saturating_sub(start) < headstart.as_millis() as u64,
            None => false,
        }
    }

    pub fn time_left(&self, now_ms: u64) -> Option<Duration> {
        self.match_end_time
            .map(|end| Duration::from_millis(end.saturating_sub(now_ms)))
    }

    pub fn has_expired(&self, now_ms: u64) -> bool {
        self.match_end_time.is_some_and(|end| now_ms >= end)
    }
}
