use async_trait::async_trait;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::domain::entity::{Facing, Lobby, Role, Status, Vec2};
use crate::domain::errors::StoreError;
use crate::domain::match_state::Winner;
use crate::domain::snapshot::{EntitySnapshot, MatchSnapshot};
use crate::domain::view::RenderView;

/// Partial update of the local player's own row. `None` fields are left untouched.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct EntityPatch {
    pub position: Option<Vec2>,
    pub facing: Option<Facing>,
    pub role: Option<Role>,
    pub status: Option<Status>,
    pub lobby: Option<Lobby>,
    // `Some(None)` clears the emote.
    pub command_animation: Option<Option<String>>,
    pub is_typing: Option<bool>,
}

/// State-changing requests the core may send. All are fire-and-forget.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreRequest {
    UpdateOwnEntity(EntityPatch),
    StartMatch { participant_ids: Vec<String> },
    Tag { victim_id: String },
    TriggerWin { winner: Winner },
    ReturnToLobby,
    SendChat { text: String },
    DeleteOwnEntity,
}

impl StoreRequest {
    /// Short label for logs.
    pub fn name(&self) -> &'static str {
        match self {
            StoreRequest::UpdateOwnEntity(_) => "update_own_entity",
            StoreRequest::StartMatch { .. } => "start_match",
            StoreRequest::Tag { .. } => "tag",
            StoreRequest::TriggerWin { .. } => "trigger_win",
            StoreRequest::ReturnToLobby => "return_to_lobby",
            StoreRequest::SendChat { .. } => "send_chat",
            StoreRequest::DeleteOwnEntity => "delete_own_entity",
        }
    }
}

// Port for outbound requests. Implementations must return immediately and report
// failures asynchronously (see `SessionEvent::RequestFailed`).
pub trait RemoteStore: Send + Sync {
    fn submit(&self, request: StoreRequest);
}

// Port for the one-time snapshot read at session start.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    async fn list_entities(&self) -> Result<Vec<EntitySnapshot>, StoreError>;
    async fn read_match(&self) -> Result<Option<MatchSnapshot>, StoreError>;
}

// Port for retrieving the current wall-clock time.
pub trait Clock: Send + Sync {
    fn now_epoch_millis(&self) -> u64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_epoch_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

// Port for the drawing collaborator; it only ever reads core state.
pub trait Renderer: Send {
    fn render(&mut self, view: &RenderView);
}
