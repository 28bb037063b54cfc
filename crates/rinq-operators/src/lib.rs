#![forbid(unsafe_code)]
//! rinq-operators: stateless sequence combinators.
//!
//! Every operator consumes one or more sequences and returns a new sequence
//! wired to a fresh producer closing over the parents. Nothing forces
//! materialization unless the algorithm inherently requires it (ordering,
//! grouping, reversal, set algebra against unknowable lengths). Items flow
//! in the deterministic order the operator chain defines; only the explicit
//! ordering/shuffle operators reorder.

pub mod async_ops;
pub mod concat;
pub mod group;
pub mod join;
pub mod misc;
pub mod order;
pub mod partition;
pub mod project;
pub mod set;

pub use concat::ConcatOps;
pub use group::GroupOps;
pub use join::{GroupJoinResult, JoinOps, JoinResult, OuterJoinResult, RightJoinResult};
pub use misc::MiscOps;
pub use order::OrderOps;
pub use partition::PartitionOps;
pub use project::ProjectOps;
pub use set::SetOps;

/// One-stop import for all operator extension traits.
pub mod prelude {
    pub use crate::concat::ConcatOps;
    pub use crate::group::GroupOps;
    pub use crate::join::JoinOps;
    pub use crate::misc::MiscOps;
    pub use crate::order::OrderOps;
    pub use crate::partition::PartitionOps;
    pub use crate::project::ProjectOps;
    pub use crate::set::SetOps;
}
