// Fixed-timestep accumulator decoupling simulation from the render cadence.

use crate::domain::CoreError;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{error, warn};

/// 1/60 s, kept exact in nanoseconds.
pub const FIXED_STEP: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Upper bound on wall time credited per scheduling callback.
pub const DEFAULT_MAX_FRAME_DELTA: Duration = Duration::from_millis(250);

/// What the loop drives.
pub trait Simulation {
    fn update(&mut self, dt: Duration) -> Result<(), CoreError>;
    fn render(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopStats {
    pub ticks: u64,
    pub frames: u64,
    pub errors: u64,
    pub faults: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameReport {
    pub ticks: u32,
    pub rendered: bool,
}

pub struct FixedStepLoop {
    step: Duration,
    max_frame_delta: Duration,
    accumulator: Duration,
    last_frame: Option<Instant>,
    stats: LoopStats,
}

impl Default for FixedStepLoop {
    fn default() -> Self {
        Self::new(FIXED_STEP, DEFAULT_MAX_FRAME_DELTA)
    }
}

impl FixedStepLoop {
    pub fn new(step: Duration, max_frame_delta: Duration) -> Self {
        Self {
            step,
            max_frame_delta,
            accumulator: Duration::ZERO,
            last_frame: None,
            stats: LoopStats::default(),
        }
    }

    pub fn step(&self) -> Duration {
        self.step
    }

    pub fn is_running(&self) -> bool {
        self.last_frame.is_some()
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Starts measuring from `now`. No-op while running.
    pub fn start(&mut self, now: Instant) {
        if self.last_frame.is_some() {
            return;
        }
        self.accumulator = Duration::ZERO;
        self.last_frame = Some(now);
    }

    /// Subsequent frames do nothing until the next `start`.
    pub fn stop(&mut self) {
        self.last_frame = None;
    }

    /// One scheduling callback: drain whole steps, then render once.
    ///
    /// `&mut` access to both the loop and the simulation rules out a second drain starting
    /// while one is in progress.
    pub fn frame<S: Simulation + ?Sized>(&mut self, now: Instant, sim: &mut S) -> FrameReport {
        let Some(last) = self.last_frame else {
            return FrameReport::default();
        };
        self.last_frame = Some(now);

        let elapsed = now.saturating_duration_since(last).min(self.max_frame_delta);
        self.accumulator += elapsed;

        let mut ticks = 0;
        while self.accumulator >= self.step {
            self.accumulator -= self.step;
            self.run_step(sim);
            ticks += 1;
        }

        if panic::catch_unwind(AssertUnwindSafe(|| sim.render())).is_err() {
            self.stats.faults += 1;
            error!("render panicked");
        }
        self.stats.frames += 1;

        FrameReport {
            ticks,
            rendered: true,
        }
    }

    fn run_step<S: Simulation + ?Sized>(&mut self, sim: &mut S) {
        let step = self.step;
        self.stats.ticks += 1;
        match panic::catch_unwind(AssertUnwindSafe(|| sim.update(step))) {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                self.stats.errors += 1;
                warn!(error = %err, tick = self.stats.ticks, "simulation step failed");
            }
            Err(_) => {
                self.stats.faults += 1;
                error!(tick = self.stats.ticks, "simulation step panicked");
            }
        }
    }
}
