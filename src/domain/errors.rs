// Domain-level errors for the simulation core and its store port.

use super::animation::AnimationError;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Animation(#[from] AnimationError),
    #[error("no entity with id `{0}`")]
    UnknownEntity(String),
    #[error("local entity `{0}` has not been loaded")]
    LocalEntityMissing(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("store rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to decode store response: {0}")]
    Decode(String),
}
