// Read-only projection handed to the renderer once per frame.

use super::chat::ChatDisplay;
use super::entity::{Facing, Lobby, Role, SimEntity, Status, Vec2};
use super::match_state::Winner;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct EntityView {
    pub id: String,
    pub display_name: String,
    pub position: Vec2,
    pub facing: Facing,
    pub role: Role,
    pub status: Status,
    pub lobby: Lobby,
    pub frame: u32,
    pub animation: String,
    pub chat: Option<ChatDisplay>,
    pub is_local: bool,
}

impl From<&SimEntity> for EntityView {
    fn from(e: &SimEntity) -> Self {
        Self {
            id: e.id.clone(),
            display_name: e.display_name.clone(),
            position: e.position,
            facing: e.facing,
            role: e.role,
            status: e.status,
            lobby: e.lobby,
            frame: e.animations.current_frame(),
            animation: e.animations.current_name().to_string(),
            chat: e.chat.display(e.is_local),
            is_local: e.is_local,
        }
    }
}

/// HUD-level match information.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchSummary {
    pub portal_population: usize,
    pub countdown_seconds: u64,
    pub time_left: Option<Duration>,
    pub is_active: bool,
    pub in_headstart: bool,
    pub winner: Option<Winner>,
    pub local_eliminated: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderView {
    /// Lobby the local player is in; only entities in it are listed.
    pub lobby: Lobby,
    pub camera_offset: Vec2,
    pub entities: Vec<EntityView>,
    pub summary: MatchSummary,
}
