#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Settle Core Library
//!
//! Core types, errors, and configuration shared by the Settle runtime and CLI.

pub mod config;
pub mod error;
pub mod types;

// Re-exports for convenience
pub use config::{LoopConfig, RejectionPolicy};
pub use error::{Error, Result};
pub use types::{DeferredId, SettleState, Settlement, TaskId, TimerId, UnhandledRejection};
