// Frame-indexed sprite animation: time offsets resolve to sheet frame indices.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// One keyframe: from `offset` onwards the pattern shows `frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameKey {
    pub offset: Duration,
    pub frame: u32,
}

/// Time → frame lookup table with loop or hold-last semantics.
#[derive(Debug, Clone)]
pub struct FramePattern {
    keys: Vec<FrameKey>,
    duration: Duration,
    looping: bool,
}

impl FramePattern {
    /// Builds a pattern; keys are ordered by offset so lookups can scan from the back.
    pub fn new(mut keys: Vec<FrameKey>, duration: Duration, looping: bool) -> Self {
        keys.sort_by_key(|key| key.offset);
        Self {
            keys,
            duration,
            looping,
        }
    }

    /// `count` consecutive sheet frames starting at `first_frame`, each shown for `frame_time`.
    pub fn uniform(first_frame: u32, count: u32, frame_time: Duration, looping: bool) -> Self {
        let keys = (0..count)
            .map(|i| FrameKey {
                offset: frame_time * i,
                frame: first_frame + i,
            })
            .collect();
        Self::new(keys, frame_time * count, looping)
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Resolves the frame shown after `elapsed` time.
    ///
    /// Empty patterns resolve to frame 0. Non-looping patterns hold their final key once
    /// `elapsed` reaches the duration; looping patterns wrap.
    pub fn frame_at(&self, elapsed: Duration) -> u32 {
        let (Some(first), Some(last)) = (self.keys.first(), self.keys.last()) else {
            return 0;
        };

        if !self.looping && elapsed >= self.duration {
            return last.frame;
        }

        let t = if self.looping {
            self.wrap(elapsed)
        } else {
            elapsed
        };

        self.keys
            .iter()
            .rev()
            .find(|key| key.offset <= t)
            .unwrap_or(first)
            .frame
    }

    /// Advances `elapsed` by `delta`, returning the new elapsed time and whether a
    /// non-looping pattern has reached its end. Looping patterns never finish.
    pub fn advance(&self, elapsed: Duration, delta: Duration) -> (Duration, bool) {
        if self.looping {
            return (self.wrap(elapsed.saturating_add(delta)), false);
        }

        if elapsed >= self.duration {
            return (self.duration, true);
        }

        let next = elapsed.saturating_add(delta);
        if next >= self.duration {
            (self.duration, true)
        } else {
            (next, false)
        }
    }

    fn wrap(&self, elapsed: Duration) -> Duration {
        let period = self.duration.as_nanos();
        if period == 0 {
            return Duration::ZERO;
        }
        // Remainder is strictly below the period, which itself came from a Duration.
        Duration::from_nanos((elapsed.as_nanos() % period) as u64)
    }
}

/// Named patterns shared by every entity using the same sprite sheet.
pub type AnimationCatalog = Arc<HashMap<String, FramePattern>>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnimationError {
    #[error("no animation named `{0}`")]
    Unknown(String),
}

/// Result of a successful `AnimationSet::play`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayOutcome {
    /// The requested pattern was already active; playback position kept.
    Unchanged,
    /// A different pattern became active and restarted from zero.
    Switched,
}

/// Per-entity playback over a shared catalog.
#[derive(Debug, Clone)]
pub struct AnimationSet {
    catalog: AnimationCatalog,
    current: String,
    elapsed: Duration,
    finished: bool,
}

impl AnimationSet {
    pub fn new(catalog: AnimationCatalog, initial: &str) -> Result<Self, AnimationError> {
        if !catalog.contains_key(initial) {
            return Err(AnimationError::Unknown(initial.to_string()));
        }
        Ok(Self {
            catalog,
            current: initial.to_string(),
            elapsed: Duration::ZERO,
            finished: false,
        })
    }

    pub fn play(&mut self, name: &str) -> Result<PlayOutcome, AnimationError> {
        if !self.catalog.contains_key(name) {
            return Err(AnimationError::Unknown(name.to_string()));
        }
        if self.current == name {
            return Ok(PlayOutcome::Unchanged);
        }
        self.current = name.to_string();
        self.reset();
        Ok(PlayOutcome::Switched)
    }

    pub fn step(&mut self, delta: Duration) {
        if let Some(pattern) = self.catalog.get(&self.current) {
            let (elapsed, finished) = pattern.advance(self.elapsed, delta);
            self.elapsed = elapsed;
            self.finished = finished;
        }
    }

    /// Restarts the active pattern.
    pub fn reset(&mut self) {
        self.elapsed = Duration::ZERO;
        self.finished = false;
    }

    pub fn current_frame(&self) -> u32 {
        self.catalog
            .get(&self.current)
            .map(|pattern| pattern.frame_at(self.elapsed))
            .unwrap_or(0)
    }

    pub fn current_name(&self) -> &str {
        &self.current
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn contains(&self, name: &str) -> bool {
        self.catalog.contains_key(name)
    }
}
