use crate::domain::entity::Vec2;
use serde::Deserialize;

/// Axis-aligned rectangle in world space.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Region {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Region {
    /// Strict containment: points on the border are outside.
    pub fn contains(&self, point: Vec2) -> bool {
        point.x > self.x && point.x < self.x + self.w && point.y > self.y && point.y < self.y + self.h
    }
}

/// World geometry shared by both lobbies.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct WorldTuning {
    /// Side length of the square world.
    pub world_size: f32,

    /// Entities are kept this far from the world edge.
    pub edge_padding: f32,

    /// Random dungeon spawns keep this far from the world edge.
    pub spawn_padding: f32,

    /// Where a fresh session places the local player in the commons.
    pub commons_spawn: Vec2Config,

    /// Standing here with enough others arms the match countdown.
    pub portal: Region,

    /// Dungeon area that sends the local player back to the commons.
    pub exit: Region,

    /// Commons position assigned when leaving through the exit.
    pub exit_destination: Vec2Config,
}

/// Serializable point for tuning files.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct Vec2Config {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2Config> for Vec2 {
    fn from(value: Vec2Config) -> Self {
        Vec2::new(value.x, value.y)
    }
}

impl WorldTuning {
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.world_size / 2.0, self.world_size / 2.0)
    }

    pub fn clamp(&self, point: Vec2) -> Vec2 {
        let min = self.edge_padding;
        let max = (self.world_size - self.edge_padding).max(min);
        Vec2::new(point.x.clamp(min, max), point.y.clamp(min, max))
    }
}

impl Default for WorldTuning {
    fn default() -> Self {
        Self {
            world_size: 3000.0,
            edge_padding: 25.0,
            spawn_padding: 100.0,
            commons_spawn: Vec2Config { x: 400.0, y: 300.0 },
            portal: Region {
                x: 1400.0,
                y: 1400.0,
                w: 200.0,
                h: 200.0,
            },
            exit: Region {
                x: 100.0,
                y: 300.0,
                w: 100.0,
                h: 100.0,
            },
            exit_destination: Vec2Config { x: 1400.0, y: 1500.0 },
        }
    }
}
