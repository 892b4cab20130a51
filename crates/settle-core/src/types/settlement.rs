//! Terminal outcome of a deferred value.

use serde::{Deserialize, Serialize};

use crate::types::SettleState;

/// The outcome a deferred value settled with.
///
/// This is what every registered continuation receives, and what
/// `all_settled` collects for each member.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement<T, E> {
    /// Settled with a value.
    Fulfilled(T),

    /// Settled with an error.
    Rejected(E),
}

impl<T, E> Settlement<T, E> {
    /// Returns `true` if the outcome is `Fulfilled`.
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settlement::Fulfilled(_))
    }

    /// Returns `true` if the outcome is `Rejected`.
    pub fn is_rejected(&self) -> bool {
        matches!(self, Settlement::Rejected(_))
    }

    /// The terminal [`SettleState`] for this outcome.
    pub fn state(&self) -> SettleState {
        match self {
            Settlement::Fulfilled(_) => SettleState::Fulfilled,
            Settlement::Rejected(_) => SettleState::Rejected,
        }
    }

    /// Converts into a `Result`, `Fulfilled` becoming `Ok`.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Settlement::Fulfilled(value) => Ok(value),
            Settlement::Rejected(error) => Err(error),
        }
    }

    /// Borrows the outcome as a `Result` of references.
    pub fn as_result(&self) -> Result<&T, &E> {
        match self {
            Settlement::Fulfilled(value) => Ok(value),
            Settlement::Rejected(error) => Err(error),
        }
    }

    /// Returns the fulfillment value, if any.
    pub fn fulfilled(self) -> Option<T> {
        match self {
            Settlement::Fulfilled(value) => Some(value),
            Settlement::Rejected(_) => None,
        }
    }

    /// Returns the rejection reason, if any.
    pub fn rejected(self) -> Option<E> {
        match self {
            Settlement::Fulfilled(_) => None,
            Settlement::Rejected(error) => Some(error),
        }
    }

    /// Maps a `Settlement<T, E>` to `Settlement<U, E>` by applying a function to the value.
    pub fn map<U, F>(self, f: F) -> Settlement<U, E>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Settlement::Fulfilled(value) => Settlement::Fulfilled(f(value)),
            Settlement::Rejected(error) => Settlement::Rejected(error),
        }
    }

    /// Maps a `Settlement<T, E>` to `Settlement<T, F>` by applying a function to the error.
    pub fn map_err<F, G>(self, g: G) -> Settlement<T, F>
    where
        G: FnOnce(E) -> F,
    {
        match self {
            Settlement::Fulfilled(value) => Settlement::Fulfilled(value),
            Settlement::Rejected(error) => Settlement::Rejected(g(error)),
        }
    }
}

impl<T, E> From<Result<T, E>> for Settlement<T, E> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Settlement::Fulfilled(value),
            Err(error) => Settlement::Rejected(error),
        }
    }
}

impl<T, E> From<Settlement<T, E>> for Result<T, E> {
    fn from(settlement: Settlement<T, E>) -> Self {
        settlement.into_result()
    }
}
