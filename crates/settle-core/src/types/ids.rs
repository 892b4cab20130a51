//! Identifier types for deferred values, tasks, and timers.
//!
//! Identifiers are plain counters handed out by an event loop, so two loops
//! may reuse the same numbers. They render as `prefix#number` (`d#12`, `t#3`,
//! `tm#1`) and parse back from that form.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::Error;

macro_rules! counter_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(u64);

        impl $name {
            /// Creates an identifier from its raw counter value.
            pub fn from_raw(raw: u64) -> Self {
                Self(raw)
            }

            /// Returns the raw counter value.
            pub fn as_u64(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "#{}"), self.0)
            }
        }

        impl std::str::FromStr for $name {
            type Err = Error;

            fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
                s.strip_prefix(concat!($prefix, "#"))
                    .and_then(|digits| digits.parse::<u64>().ok())
                    .map(Self)
                    .ok_or_else(|| Error::invalid_id(s))
            }
        }

        impl From<$name> for u64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

counter_id!(
    /// Identifier of a deferred value.
    DeferredId,
    "d"
);

counter_id!(
    /// Identifier of a queued task or spawned async computation.
    TaskId,
    "t"
);

counter_id!(
    /// Identifier of a scheduled timer.
    ///
    /// Timer ids increase in scheduling order, which is also the tie-break
    /// order for timers due at the same instant.
    TimerId,
    "tm"
);
