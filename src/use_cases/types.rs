// Use-case level inputs for the session loop.

use crate::domain::ports::StoreRequest;
use crate::domain::systems::movement::MoveIntent;
use crate::domain::{ChangeEvent, StoreError};

/// Input from the local player, delivered by the (external) input collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalInput {
    Move(MoveIntent),
    ChatStart,
    ChatKey(char),
    ChatBackspace,
    ChatCommit,
    /// "Return now" on the results screen.
    ReturnToLobby,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    Change(ChangeEvent),
    Input(LocalInput),
    RequestFailed {
        request: StoreRequest,
        error: StoreError,
    },
}
