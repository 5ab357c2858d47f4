// Domain layer: core simulation types and rules.

pub mod animation;
pub mod camera;
pub mod character;
pub mod chat;
pub mod entity;
pub mod errors;
pub mod match_state;
pub mod ports;
pub mod snapshot;
pub mod systems;
pub mod tuning;
pub mod view;

pub use entity::{Facing, Lobby, Role, SimEntity, Status, Vec2};
pub use errors::{CoreError, StoreError};
pub use match_state::{MatchState, Winner};
pub use snapshot::{ChangeEvent, EntitySnapshot, MatchSnapshot, MessageSnapshot};
