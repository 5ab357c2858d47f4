use super::session::Session;
use super::sim_loop::{FixedStepLoop, LoopStats};
use super::types::SessionEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, mpsc};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{info, warn};

/// Owns the session for its lifetime: drains inbound events, then runs one loop frame per
/// scheduling callback.
pub async fn session_task(
    mut session: Session,
    mut events: mpsc::Receiver<SessionEvent>,
    frame_interval: Duration,
    shutdown: Arc<Notify>,
) -> LoopStats {
    let mut sim_loop = FixedStepLoop::default();
    let mut interval = tokio::time::interval(frame_interval);
    // A late callback should not be followed by a burst; the accumulator absorbs the gap.
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    sim_loop.start(Instant::now().into_std());
    info!(session_id = %session.session_id(), "session loop started");

    loop {
        tokio::select! {
            _ = shutdown.notified() => {
                break;
            }
            _ = interval.tick() => {}
        }

        while let Ok(event) = events.try_recv() {
            if let Err(e) = session.handle_event(event) {
                warn!(error = %e, "session event rejected");
            }
        }

        sim_loop.frame(Instant::now().into_std(), &mut session);
    }

    sim_loop.stop();
    let stats = sim_loop.stats();
    info!(
        ticks = stats.ticks,
        frames = stats.frames,
        errors = stats.errors,
        faults = stats.faults,
        "session loop stopped"
    );
    stats
}
