//! Unhandled rejection reports.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::DeferredId;

/// A rejected deferred value that had no error continuation when the task
/// queue drained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnhandledRejection {
    /// The deferred value that rejected
    pub deferred: DeferredId,

    /// `Debug` rendering of the rejection reason
    pub reason: String,

    /// Virtual loop time at which the value rejected
    pub at: Duration,
}

impl UnhandledRejection {
    /// Creates a new report entry.
    pub fn new(deferred: DeferredId, reason: impl Into<String>, at: Duration) -> Self {
        Self {
            deferred,
            reason: reason.into(),
            at,
        }
    }
}

impl std::fmt::Display for UnhandledRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} rejected at {}ms: {}",
            self.deferred,
            self.at.as_millis(),
            self.reason
        )
    }
}
