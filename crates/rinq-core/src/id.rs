//! Strongly-typed identifiers used across the engine.
//!
//! Sequence ids are allocated from a process-local counter; they exist for
//! lineage diagnostics and log correlation, not for persistence.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

macro_rules! new_id {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(v: u64) -> Self {
                Self(v)
            }
            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self.0)
            }
        }
    };
}

new_id!(SeqId);

static NEXT_SEQ_ID: AtomicU64 = AtomicU64::new(1);

impl SeqId {
    /// Allocate the next process-local id.
    pub fn next() -> Self {
        Self(NEXT_SEQ_ID.fetch_add(1, Ordering::Relaxed))
    }
}
