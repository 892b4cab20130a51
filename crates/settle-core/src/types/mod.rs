//! Core types for deferred values.

mod ids;
mod proptests;
mod rejection;
mod settle_state;
mod settlement;

pub use ids::{DeferredId, TaskId, TimerId};
pub use rejection::UnhandledRejection;
pub use settle_state::SettleState;
pub use settlement::Settlement;
