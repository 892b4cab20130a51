//! Error types for Settle core library.

/// Errors raised by the Settle runtime itself.
///
/// These describe failures of the event loop and its configuration, never the
/// rejection reason of an individual deferred value (that travels through the
/// value's own error type). All variants are `#[non_exhaustive]` to allow
/// adding new error types without breaking changes.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// `run_until_idle` or `run_tasks` was called from inside a running task.
    #[error("Event loop is already running")]
    Reentrant,

    /// A single run executed more tasks than the configured budget allows.
    #[error("Task budget exceeded: {limit} tasks")]
    TaskBudgetExceeded {
        /// The configured `max_tasks_per_run`
        limit: usize,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Config {
        /// What configuration is problematic
        message: String,
    },

    /// I/O error (reading configuration files)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML configuration could not be parsed
    #[error("Config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An identifier string did not match the expected `prefix#number` form
    #[error("Invalid identifier: {value}")]
    InvalidId {
        /// The string that failed to parse
        value: String,
    },

    /// Scenario not found
    #[error("Unknown scenario: {name}")]
    UnknownScenario {
        /// Scenario name that was requested
        name: String,
    },
}

/// Convenience `Result` type alias for Settle operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns whether the event loop is still usable after this error.
    ///
    /// A reentrant call leaves the outer run untouched, and an exhausted task
    /// budget leaves the remaining work queued so a later run resumes it.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Reentrant => true,
            Error::TaskBudgetExceeded { .. } => true,
            Error::Config { .. } => false,
            Error::Io(_) => false,
            Error::ConfigParse(_) => false,
            Error::Serialization(_) => false,
            Error::InvalidId { .. } => false,
            Error::UnknownScenario { .. } => false,
        }
    }

    /// Creates a new configuration error.
    pub fn config<S: Into<String>>(message: S) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Creates a new invalid identifier error.
    pub fn invalid_id<S: Into<String>>(value: S) -> Self {
        Error::InvalidId {
            value: value.into(),
        }
    }

    /// Creates a new unknown scenario error.
    pub fn unknown_scenario<S: Into<String>>(name: S) -> Self {
        Error::UnknownScenario { name: name.into() }
    }
}
