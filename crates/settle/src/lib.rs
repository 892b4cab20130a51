#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Settle Runtime
//!
//! Deferred values, continuations, combinators, and async computations on a
//! single-threaded event loop.

pub mod async_fn;
pub mod combinators;
pub mod deferred;
pub mod event_loop;
mod proptests;
mod rejections;

// Re-exports for convenience
pub use async_fn::Awaiting;
pub use combinators::{all_of, all_settled, any_of, first_of};
pub use deferred::{Continuation, Deferred, Reason, Resolution, Resolver, Settleable};
pub use event_loop::{EventLoop, RunStats};
pub use settle_core::{
    DeferredId, Error, LoopConfig, RejectionPolicy, Result, SettleState, Settlement, TaskId,
    TimerId, UnhandledRejection,
};
