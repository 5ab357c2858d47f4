// Typed, already-defaulted views of rows coming from the external store.

use super::entity::{Facing, Lobby, Role, Status, Vec2};
use super::match_state::Winner;

pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown";

#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    pub id: String,
    // Realtime rows carry no joined profile, so the name is often absent.
    pub display_name: Option<String>,
    pub position: Vec2,
    pub facing: Facing,
    pub role: Role,
    pub status: Status,
    pub lobby: Lobby,
    pub command_animation: Option<String>,
    pub is_typing: bool,
}

impl EntitySnapshot {
    /// Snapshot with every optional field at its fallback value and no name.
    pub fn new(id: impl Into<String>, position: Vec2) -> Self {
        Self {
            id: id.into(),
            display_name: None,
            position,
            facing: Facing::default(),
            role: Role::default(),
            status: Status::default(),
            lobby: Lobby::default(),
            command_animation: None,
            is_typing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MatchSnapshot {
    pub is_active: bool,
    // Epoch millis.
    pub match_start_time: Option<u64>,
    pub winner: Option<Winner>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageSnapshot {
    pub sender_id: String,
    pub text: String,
}

/// One entry of the unordered, at-least-once change feed.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    EntityUpserted(EntitySnapshot),
    EntityRemoved { id: String },
    MatchChanged(MatchSnapshot),
    MessageInserted(MessageSnapshot),
}
