//! Event loop configuration.
//!
//! Configuration is plain serde data so it can be embedded in a larger
//! application config or loaded on its own from TOML:
//!
//! ```toml
//! max_tasks_per_run = 10000
//! unhandled_rejections = "record"
//! trace_tasks = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};

/// Default upper bound on tasks executed by a single run.
pub const DEFAULT_MAX_TASKS_PER_RUN: usize = 1_000_000;

/// What the event loop does with rejections nobody handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionPolicy {
    /// Do not track unhandled rejections.
    Ignore,

    /// Record them and emit a `warn` event for each.
    #[default]
    Warn,

    /// Record them without logging.
    Record,
}

impl RejectionPolicy {
    /// Returns `true` if unhandled rejections are kept for later draining.
    pub fn records(&self) -> bool {
        !matches!(self, RejectionPolicy::Ignore)
    }
}

/// Event loop configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    /// Upper bound on tasks a single `run_until_idle` / `run_tasks` call may
    /// execute before giving up with `Error::TaskBudgetExceeded`.
    pub max_tasks_per_run: usize,

    /// Handling of rejections without an error continuation.
    pub unhandled_rejections: RejectionPolicy,

    /// Wrap every task in a `debug`-level tracing span.
    pub trace_tasks: bool,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_tasks_per_run: DEFAULT_MAX_TASKS_PER_RUN,
            unhandled_rejections: RejectionPolicy::default(),
            trace_tasks: false,
        }
    }
}

impl LoopConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: LoopConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), "Loading loop configuration");
        Self::from_toml_str(&content)
    }

    /// Checks invariants that serde cannot express.
    pub fn validate(&self) -> Result<()> {
        if self.max_tasks_per_run == 0 {
            return Err(Error::config(
                "max_tasks_per_run must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Sets the task budget.
    pub fn with_max_tasks(mut self, max_tasks_per_run: usize) -> Self {
        self.max_tasks_per_run = max_tasks_per_run;
        self
    }

    /// Sets the unhandled rejection policy.
    pub fn with_rejection_policy(mut self, policy: RejectionPolicy) -> Self {
        self.unhandled_rejections = policy;
        self
    }

    /// Enables or disables per-task tracing spans.
    pub fn with_trace_tasks(mut self, trace_tasks: bool) -> Self {
        self.trace_tasks = trace_tasks;
        self
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::config(e.to_string()))
    }
}
