use std::time::{Duration, Instant};

pub const LOG_THROTTLE: Duration = Duration::from_secs(2);

/// Starting point that lets the first throttled log through immediately.
pub fn log_epoch() -> Instant {
    Instant::now()
        .checked_sub(LOG_THROTTLE)
        .unwrap_or_else(Instant::now)
}

pub fn should_log(last: &mut Instant) -> bool {
    if last.elapsed() >= LOG_THROTTLE {
        *last = Instant::now();
        true
    } else {
        false
    }
}
