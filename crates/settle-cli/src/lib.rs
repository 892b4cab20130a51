//! # settle-cli
//!
//! Runs small deferred-value programs ("scenarios") on a fresh event loop and
//! reports how they settled:
//! - continuation chains with a recovered error
//! - positional `all_of` over staggered timers
//! - `first_of` races
//! - async bodies awaiting deferred values
//! - unhandled rejection reporting

#![warn(missing_docs)]
#![warn(clippy::all)]
#![forbid(unsafe_code)]

pub mod cli;
pub mod report;
pub mod scenarios;

pub use report::Report;
pub use scenarios::{SCENARIOS, Scenario, find_scenario, run_scenario};
