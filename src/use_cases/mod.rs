// Use cases layer: the session workflow driven by the fixed-step loop.

pub mod driver;
pub mod match_machine;
pub mod reconciler;
pub mod session;
pub mod sim_loop;
pub mod types;

pub use driver::session_task;
pub use match_machine::MatchStateMachine;
pub use reconciler::{EntityReconciler, UpsertOutcome};
pub use session::Session;
pub use sim_loop::{FixedStepLoop, FrameReport, LoopStats, Simulation};
pub use types::{LocalInput, SessionEvent};
