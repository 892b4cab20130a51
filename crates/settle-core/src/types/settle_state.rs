//! Deferred value state tracking.

use serde::{Deserialize, Serialize};

/// The current state of a deferred value.
///
/// A value starts `Pending` and moves to exactly one terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettleState {
    /// Not yet settled.
    Pending,

    /// Settled with a value.
    Fulfilled,

    /// Settled with an error.
    Rejected,
}

impl SettleState {
    /// Returns `true` if the value is in a terminal state (Fulfilled or Rejected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, SettleState::Fulfilled | SettleState::Rejected)
    }

    /// Returns `true` if the value has not settled yet.
    pub fn is_pending(&self) -> bool {
        matches!(self, SettleState::Pending)
    }
}

impl std::fmt::Display for SettleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettleState::Pending => write!(f, "pending"),
            SettleState::Fulfilled => write!(f, "fulfilled"),
            SettleState::Rejected => write!(f, "rejected"),
        }
    }
}
