use crate::domain::entity::{Facing, SimEntity, Vec2};

/// Held directions for the local player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MoveIntent {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
}

impl MoveIntent {
    pub fn is_idle(&self) -> bool {
        !(self.up || self.down || self.left || self.right)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MovementConfig {
    pub speed: f32, // units/s

    pub min: f32,
    pub max: f32,
}

/// Local prediction step. Returns whether the entity moved.
pub fn tick_entity(e: &mut SimEntity, intent: MoveIntent, dt: f32, cfg: MovementConfig) -> bool {
    let mut dir = Vec2::default();
    if intent.up {
        dir.y -= 1.0;
    }
    if intent.down {
        dir.y += 1.0;
    }
    if intent.left {
        dir.x -= 1.0;
    }
    if intent.right {
        dir.x += 1.0;
    }

    // Opposite keys cancel; facing only follows a net horizontal direction.
    if dir.x < 0.0 {
        e.facing = Facing::Left;
    } else if dir.x > 0.0 {
        e.facing = Facing::Right;
    }

    // position integrate (per-axis speed, so diagonals cover more ground)
    let before = e.position;
    e.position = e.position + dir * (cfg.speed * dt);

    // world clamp
    clamp_entity(e, cfg);

    e.target_position = e.position;
    e.position != before
}

fn clamp_entity(e: &mut SimEntity, cfg: MovementConfig) {
    e.position.x = e.position.x.clamp(cfg.min, cfg.max);
    e.position.y = e.position.y.clamp(cfg.min, cfg.max);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::character::character_animations;

    fn cfg() -> MovementConfig {
        MovementConfig {
            speed: 360.0,
            min: 25.0,
            max: 2975.0,
        }
    }

    fn entity_at(x: f32, y: f32) -> SimEntity {
        SimEntity::new("me", "Me", Vec2::new(x, y), true, character_animations())
            .expect("stand exists")
    }

    #[test]
    fn when_moving_left_then_position_and_facing_follow() {
        let mut e = entity_at(100.0, 100.0);
        let moved = tick_entity(
            &mut e,
            MoveIntent {
                left: true,
                ..Default::default()
            },
            0.5,
            cfg(),
        );

        assert!(moved);
        assert_eq!(e.position, Vec2::new(25.0, 100.0));
        assert_eq!(e.facing, Facing::Left);
        assert_eq!(e.target_position, e.position);
    }

    #[test]
    fn when_pushing_into_the_edge_then_the_entity_does_not_move() {
        let mut e = entity_at(25.0, 25.0);
        let moved = tick_entity(
            &mut e,
            MoveIntent {
                up: true,
                left: true,
                ..Default::default()
            },
            1.0 / 60.0,
            cfg(),
        );

        assert!(!moved);
        assert_eq!(e.position, Vec2::new(25.0, 25.0));
    }

    #[test]
    fn when_idle_then_facing_is_kept() {
        let mut e = entity_at(500.0, 500.0);
        e.facing = Facing::Left;

        let moved = tick_entity(&mut e, MoveIntent::default(), 1.0 / 60.0, cfg());
        assert!(!moved);
        assert_eq!(e.facing, Facing::Left);
    }

    #[test]
    fn when_moving_down_one_step_then_distance_matches_speed() {
        let mut e = entity_at(500.0, 500.0);
        tick_entity(
            &mut e,
            MoveIntent {
                down: true,
                ..Default::default()
            },
            0.25,
            cfg(),
        );
        assert_eq!(e.position, Vec2::new(500.0, 590.0));
    }
}
