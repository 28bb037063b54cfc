#![forbid(unsafe_code)]
//! rinq: a declarative, composable query engine over ordered collections.
//!
//! One abstraction, [`Sequence`], supports filtering, projection, joining,
//! grouping, ordering, set algebra, and aggregation, all built from a single
//! pull-based iteration protocol with three evaluation strategies
//! (materialize-once, stream-once, live-dynamic) plus a passthrough mode
//! over a foreign iterable.
//!
//! ```
//! use rinq::prelude::*;
//!
//! let seq = Sequence::from_values(vec![Value::Int(1), Value::Int(3), Value::Int(2)]);
//! let big = seq.where_with(|v, _| matches!(v, Value::Int(i) if *i > 1));
//! let items: Vec<Value> = big.iterate().collect::<rinq::Result<_>>().unwrap();
//! assert_eq!(items, vec![Value::Int(3), Value::Int(2)]);
//! ```

pub use rinq_core::{Error, Result, Sequence, Value};

pub use rinq_core as core;
pub use rinq_exec as exec;
pub use rinq_operators as operators;

/// Everything needed to build and evaluate sequence queries.
pub mod prelude {
    pub use rinq_core::prelude::*;
    pub use rinq_exec::prelude::*;
    pub use rinq_operators::prelude::*;
}
