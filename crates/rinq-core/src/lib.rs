#![forbid(unsafe_code)]
//! rinq-core: the Sequence state machine, pull protocol, item value model,
//! and error taxonomy.
//!
//! Design intent:
//! - Keep this crate pure and synchronous (no async, no I/O, no runtime).
//! - One abstraction: `Sequence`, a lazily-evaluated ordered collection with
//!   four evaluation modes (materialized, streaming-cached,
//!   streaming-uncached, dynamic) plus a passthrough over foreign iterables.
//! - Operators and terminal evaluators live in downstream crates and consume
//!   only the iteration protocol exposed here.

pub mod accessor;
pub mod config;
pub mod error;
pub mod hash;
pub mod id;
pub mod prelude;
pub mod sequence;
pub mod value;

pub use error::{Error, Result};
pub use sequence::Sequence;
pub use value::Value;
