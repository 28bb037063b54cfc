#![forbid(unsafe_code)]
//! rinq-exec: terminal evaluators, the wire format, and named-operator
//! dispatch.
//!
//! Terminals consume a sequence to completion (or partially, for the
//! short-circuiting extractors) and return a non-sequence result. The wire
//! format and the `Engine` form the boundary consumed by an external
//! worker-pool dispatcher: construct by type name, invoke by operator name,
//! serialize the outcome back.

pub mod convert;
pub mod engine;
pub mod error;
pub mod fold;
pub mod pick;
pub mod wire;

pub use convert::{ConvertOps, ValueMap, ValueSet};
pub use engine::{Engine, Outcome, Param, ParamFn};
pub use error::{ExecError, Result};
pub use fold::{FoldFn, FoldOps};
pub use pick::{Filter, PickOps};
pub use wire::{from_json, from_wire, from_wire_with, to_json, to_wire, value_to_json, WirePacket};

/// One-stop import for the terminal extension traits.
pub mod prelude {
    pub use crate::convert::ConvertOps;
    pub use crate::fold::FoldOps;
    pub use crate::pick::PickOps;
}
