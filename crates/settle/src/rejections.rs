//! Unhandled rejection tracking.
//!
//! A value that rejects before anything subscribed to it becomes a
//! *candidate*. Candidates still unhandled when the task queue drains are
//! *reported*. Subscribing later removes the entry from either list.

use settle_core::{DeferredId, RejectionPolicy, UnhandledRejection};

use crate::event_loop::millis;

#[derive(Debug, Default)]
pub(crate) struct RejectionTracker {
    candidates: Vec<UnhandledRejection>,
    reported: Vec<UnhandledRejection>,
}

impl RejectionTracker {
    pub(crate) fn track(&mut self, report: UnhandledRejection) {
        self.candidates.push(report);
    }

    /// Forgets a rejection once a continuation is attached to it.
    pub(crate) fn handled(&mut self, deferred: DeferredId) -> bool {
        let before = self.candidates.len();
        self.candidates.retain(|r| r.deferred != deferred);
        if self.candidates.len() != before {
            return true;
        }

        let before = self.reported.len();
        self.reported.retain(|r| r.deferred != deferred);
        if self.reported.len() != before {
            tracing::debug!(deferred = %deferred, "Previously unhandled rejection was handled");
            return true;
        }
        false
    }

    /// Promotes every candidate to a report.
    pub(crate) fn flush(&mut self, policy: RejectionPolicy) -> usize {
        let flushed = self.candidates.len();
        for report in self.candidates.drain(..) {
            if policy == RejectionPolicy::Warn {
                tracing::warn!(
                    deferred = %report.deferred,
                    reason = %report.reason,
                    at_ms = millis(report.at),
                    "Unhandled rejection"
                );
            }
            self.reported.push(report);
        }
        flushed
    }

    pub(crate) fn reported(&self) -> &[UnhandledRejection] {
        &self.reported
    }

    pub(crate) fn drain(&mut self) -> Vec<UnhandledRejection> {
        std::mem::take(&mut self.reported)
    }
}
