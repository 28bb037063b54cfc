//! Convenient re-exports for downstream crates.

pub use crate::accessor::{
    comparer, predicate, selector, Accessor, Comparer, ItemCompare, KeyCompare, KeyFn, Predicate,
    Selector,
};
pub use crate::config::EngineConfig;
pub use crate::error::{Error, Result};
pub use crate::hash::{hash_value, Hash256};
pub use crate::id::SeqId;
pub use crate::sequence::{
    defer, CountEstimate, ExtendedSource, LengthHint, Pull, PullFactory, Sequence,
};
pub use crate::value::{default_ordering, Value};
