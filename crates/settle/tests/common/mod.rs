//! Common test utilities and harness for Settle integration tests.

#![allow(dead_code)]

use settle::{Deferred, EventLoop, LoopConfig, RejectionPolicy, Settlement};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

/// Test harness wrapping an event loop and an event log.
///
/// Continuations push labels into the log so tests can assert on the order
/// in which things happened.
pub struct TestHarness {
    /// The loop under test
    pub event_loop: EventLoop,

    /// Labels recorded by continuations, in execution order
    pub log: Rc<RefCell<Vec<String>>>,
}

impl TestHarness {
    /// Creates a harness that records unhandled rejections without logging.
    pub fn new() -> Self {
        Self::with_config(LoopConfig::default().with_rejection_policy(RejectionPolicy::Record))
    }

    /// Creates a harness with a custom loop configuration.
    pub fn with_config(config: LoopConfig) -> Self {
        init_tracing();
        Self {
            event_loop: EventLoop::with_config(config),
            log: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Returns a closure that appends `label` to the log.
    pub fn recorder(&self) -> impl Fn(String) + 'static {
        let log = Rc::clone(&self.log);
        move |label| log.borrow_mut().push(label)
    }

    /// A snapshot of the log.
    pub fn entries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    /// A value fulfilled with `value` after `ms` milliseconds of loop time.
    pub fn fulfill_after<T: Clone + 'static>(&self, ms: u64, value: T) -> Deferred<T, String> {
        Deferred::after(
            &self.event_loop,
            Duration::from_millis(ms),
            Settlement::Fulfilled(value),
        )
    }

    /// A value rejected with `reason` after `ms` milliseconds of loop time.
    pub fn reject_after<T: Clone + 'static>(&self, ms: u64, reason: &str) -> Deferred<T, String> {
        Deferred::after(
            &self.event_loop,
            Duration::from_millis(ms),
            Settlement::Rejected(reason.to_string()),
        )
    }

    /// Runs the loop to completion.
    pub fn run(&self) -> settle::RunStats {
        self.event_loop
            .run_until_idle()
            .expect("event loop should drain")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs a test-writer tracing subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Shorthand for milliseconds.
pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}
