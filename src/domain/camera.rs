use super::entity::Vec2;

/// Viewport that follows a target while never showing space outside the square world.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub viewport: Vec2,
    pub world_size: f32,
}

impl Camera {
    pub fn new(viewport: Vec2, world_size: f32) -> Self {
        Self {
            viewport,
            world_size,
        }
    }

    /// Translation to apply to world coordinates so `target` sits mid-screen, clamped to
    /// the world edges. Worlds smaller than the viewport pin to the origin.
    pub fn follow(&self, target: Vec2) -> Vec2 {
        Vec2::new(
            clamp_axis(self.viewport.x / 2.0 - target.x, self.viewport.x, self.world_size),
            clamp_axis(self.viewport.y / 2.0 - target.y, self.viewport.y, self.world_size),
        )
    }
}

fn clamp_axis(offset: f32, viewport: f32, world: f32) -> f32 {
    offset.max(viewport - world).min(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn camera() -> Camera {
        Camera::new(Vec2::new(1280.0, 720.0), 3000.0)
    }

    #[test]
    fn centred_target_is_placed_mid_screen() {
        let offset = camera().follow(Vec2::new(1500.0, 1500.0));
        assert_eq!(offset, Vec2::new(640.0 - 1500.0, 360.0 - 1500.0));
    }

    #[test]
    fn offsets_clamp_at_the_world_edges() {
        let near_origin = camera().follow(Vec2::new(10.0, 10.0));
        assert_eq!(near_origin, Vec2::new(0.0, 0.0));

        let far_corner = camera().follow(Vec2::new(2990.0, 2990.0));
        assert_eq!(far_corner, Vec2::new(1280.0 - 3000.0, 720.0 - 3000.0));
    }

    #[test]
    fn small_worlds_pin_to_the_origin() {
        let camera = Camera::new(Vec2::new(1280.0, 720.0), 500.0);
        assert_eq!(camera.follow(Vec2::new(250.0, 250.0)), Vec2::new(0.0, 0.0));
    }
}
