//! Offline mutation queue and the drainer that replays it.

mod drainer;
mod pending_action_model;
mod replay_retry;

pub use drainer::*;
pub use pending_action_model::*;
pub use replay_retry::*;
