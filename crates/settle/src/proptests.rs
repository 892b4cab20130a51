//! Property-based tests for the runtime.
