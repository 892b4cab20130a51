//! Scenario reports.

use serde::Serialize;
use settle::{RunStats, Settlement, UnhandledRejection};
use std::fmt;

/// How a scenario's result value ended up, plus loop counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    /// Scenario name
    pub scenario: String,

    /// Final settlement of the scenario's result, `None` if still pending
    pub outcome: Option<Settlement<String, String>>,

    /// Virtual time the run took, in milliseconds
    pub elapsed_ms: u64,

    /// Tasks executed
    pub tasks_run: usize,

    /// Timers fired
    pub timers_fired: usize,

    /// Rejections nobody handled
    pub unhandled: Vec<UnhandledRejection>,
}

impl Report {
    /// Builds a report from a finished run.
    pub fn new(
        scenario: impl Into<String>,
        outcome: Option<Settlement<String, String>>,
        stats: RunStats,
        unhandled: Vec<UnhandledRejection>,
    ) -> Self {
        Self {
            scenario: scenario.into(),
            outcome,
            elapsed_ms: u64::try_from(stats.elapsed.as_millis()).unwrap_or(u64::MAX),
            tasks_run: stats.tasks_run,
            timers_fired: stats.timers_fired,
            unhandled,
        }
    }

    /// Renders the report as pretty-printed JSON.
    pub fn to_json(&self) -> settle::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "scenario: {}", self.scenario)?;
        match &self.outcome {
            Some(Settlement::Fulfilled(value)) => writeln!(f, "result:   fulfilled: {value}")?,
            Some(Settlement::Rejected(reason)) => writeln!(f, "result:   rejected: {reason}")?,
            None => writeln!(f, "result:   pending")?,
        }
        writeln!(f, "elapsed:  {}ms", self.elapsed_ms)?;
        writeln!(f, "tasks:    {}", self.tasks_run)?;
        writeln!(f, "timers:   {}", self.timers_fired)?;
        write!(f, "unhandled rejections: {}", self.unhandled.len())?;
        for rejection in &self.unhandled {
            write!(f, "\n  - {rejection}")?;
        }
        Ok(())
    }
}
