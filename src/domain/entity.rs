// Domain-level simulation entities: one record per connected player.

use super::animation::{AnimationCatalog, AnimationError, AnimationSet};
use super::character;
use super::chat::EphemeralMessage;
use std::ops::{Add, Mul, Sub};
use std::time::Duration;

// Below this distance an interpolating entity snaps onto its target.
const SNAP_EPSILON: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Vec2) -> f32 {
        (self - other).length()
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Normal,
    Hunter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    #[default]
    Alive,
    Eliminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lobby {
    #[default]
    Commons,
    Dungeon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Facing {
    Left,
    #[default]
    Right,
}

#[derive(Debug, Clone)]
pub struct SimEntity {
    pub id: String,
    pub display_name: String,
    pub position: Vec2,
    pub target_position: Vec2,
    pub facing: Facing,
    pub role: Role,
    pub status: Status,
    pub lobby: Lobby,
    pub command_animation: Option<String>,
    // Epoch millis of the last authoritative update.
    pub last_seen: u64,
    pub is_local: bool,

    // Presentation state (never sent back to the store directly).
    pub animations: AnimationSet,
    pub chat: EphemeralMessage,
}

impl SimEntity {
    pub fn new(
        id: impl Into<String>,
        display_name: impl Into<String>,
        position: Vec2,
        is_local: bool,
        catalog: AnimationCatalog,
    ) -> Result<Self, AnimationError> {
        Ok(Self {
            id: id.into(),
            display_name: display_name.into(),
            position,
            target_position: position,
            facing: Facing::default(),
            role: Role::default(),
            status: Status::default(),
            lobby: Lobby::default(),
            command_animation: None,
            last_seen: 0,
            is_local,
            animations: AnimationSet::new(catalog, character::STAND)?,
            chat: EphemeralMessage::default(),
        })
    }

    pub fn is_alive(&self) -> bool {
        self.status == Status::Alive
    }

    pub fn is_hunter(&self) -> bool {
        self.role == Role::Hunter
    }

    /// Exponential smoothing toward `target_position`; never overshoots for factors in (0, 1].
    pub fn interpolate(&mut self, factor: f32) {
        let factor = factor.clamp(0.0, 1.0);
        let delta = self.target_position - self.position;
        if delta.length() <= SNAP_EPSILON {
            self.position = self.target_position;
            return;
        }
        self.position = self.position + delta * factor;
    }

    /// Selects and advances the animation for this tick.
    ///
    /// Emotes win over locomotion until they finish. Unknown emote names (e.g. from a newer
    /// client) are dropped and reported so the caller can log them.
    pub fn step_animation(&mut self, delta: Duration, moving: bool) -> Result<(), AnimationError> {
        if moving && self.is_local {
            // Walking away cancels whatever emote was playing.
            self.command_animation = None;
        }

        let wanted = match self.command_animation.as_deref() {
            Some(name) => name.to_string(),
            None if moving => character::WALK.to_string(),
            None => character::STAND.to_string(),
        };

        if let Err(err) = self.animations.play(&wanted) {
            self.command_animation = None;
            self.animations.play(character::STAND)?;
            self.animations.step(delta);
            return Err(err);
        }
        self.animations.step(delta);

        // Only the owner advances emote chains; observers mirror the owner's command.
        if self.is_local && self.animations.is_finished() {
            if let Some(current) = self.command_animation.take() {
                self.command_animation = character::emote_successor(&current).map(str::to_string);
            }
        }
        Ok(())
    }

    /// Starts an emote requested by a chat command. Returns whether the command applied.
    pub fn begin_emote(&mut self, emote: &str) -> bool {
        if emote == character::SIT_TO_STAND {
            // Standing up only makes sense from a seated pose.
            let seated = self
                .command_animation
                .as_deref()
                .is_some_and(character::is_seated);
            if !seated {
                return false;
            }
        }
        if !self.animations.contains(emote) {
            return false;
        }
        self.command_animation = Some(emote.to_string());
        true
    }
}
