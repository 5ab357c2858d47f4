// Animation catalogue for the player character sprite sheet.

use super::animation::{AnimationCatalog, FrameKey, FramePattern};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const STAND: &str = "stand";
pub const WALK: &str = "walk";
pub const SIT: &str = "sit";
pub const SIT_LOOP: &str = "sit_loop";
pub const SIT_TO_STAND: &str = "sit_to_stand";
pub const CRY: &str = "cry";
pub const DANCE: &str = "dance";

// Idle frames linger; locomotion and emotes run at double speed.
const STAND_FRAME_TIME: Duration = Duration::from_millis(200);
const FAST_FRAME_TIME: Duration = Duration::from_millis(100);

/// Builds the shared catalogue. Facing is handled by mirroring, so one pattern per motion.
pub fn character_animations() -> AnimationCatalog {
    let mut patterns = HashMap::new();
    patterns.insert(
        STAND.to_string(),
        FramePattern::uniform(0, 8, STAND_FRAME_TIME, true),
    );
    patterns.insert(
        WALK.to_string(),
        FramePattern::uniform(8, 16, FAST_FRAME_TIME, true),
    );
    patterns.insert(
        SIT.to_string(),
        FramePattern::uniform(24, 9, FAST_FRAME_TIME, false),
    );
    patterns.insert(
        SIT_LOOP.to_string(),
        FramePattern::new(
            vec![
                FrameKey {
                    offset: Duration::ZERO,
                    frame: 30,
                },
                FrameKey {
                    offset: Duration::from_millis(40),
                    frame: 31,
                },
            ],
            Duration::from_millis(80),
            true,
        ),
    );
    patterns.insert(
        SIT_TO_STAND.to_string(),
        FramePattern::uniform(32, 8, FAST_FRAME_TIME, false),
    );
    patterns.insert(
        CRY.to_string(),
        FramePattern::uniform(40, 16, FAST_FRAME_TIME, false),
    );
    patterns.insert(
        DANCE.to_string(),
        FramePattern::uniform(57, 15, FAST_FRAME_TIME, false),
    );
    Arc::new(patterns)
}

/// What an emote turns into once its non-looping pattern has played out.
/// `None` hands control back to locomotion.
pub fn emote_successor(name: &str) -> Option<&'static str> {
    match name {
        SIT => Some(SIT_LOOP),
        _ => None,
    }
}

/// Emotes that keep the character seated until it moves or stands up.
pub fn is_seated(name: &str) -> bool {
    matches!(name, SIT | SIT_LOOP)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalogue_contains_every_named_motion() {
        let catalog = character_animations();
        for name in [STAND, WALK, SIT, SIT_LOOP, SIT_TO_STAND, CRY, DANCE] {
            assert!(catalog.contains_key(name), "missing {name}");
        }
    }

    #[test]
    fn sit_hands_over_to_the_seated_loop() {
        assert_eq!(emote_successor(SIT), Some(SIT_LOOP));
        assert_eq!(emote_successor(DANCE), None);
        assert!(is_seated(SIT_LOOP));
        assert!(!is_seated(CRY));
    }
}
