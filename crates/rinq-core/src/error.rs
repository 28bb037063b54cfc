use thiserror::Error;

/// Canonical result for core.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy of the iteration protocol and the evaluators built on it.
///
/// Every failure is a synchronous, immediate signal at the call site; the
/// engine performs no I/O and nothing is transient, so there are no retries.
#[derive(Debug, Error)]
pub enum Error {
    /// Iteration attempted on a non-caching, non-dynamic sequence that has
    /// already been fully drained.
    #[error("sequence was already fully iterated and does not cache items")]
    ExhaustedSingleUse,

    /// An operation requiring full materialization was invoked on a sequence
    /// whose length hint is the infinite sentinel.
    #[error("operation requires a finite sequence")]
    NotFinite,

    /// `first`/`last`/`single`/`min`/`max`/non-seeded `aggregate` on an
    /// empty source.
    #[error("sequence contains no matching item")]
    EmptyResult,

    /// `single` found more than one qualifying item.
    #[error("more than one matching item (second match at index {index})")]
    MultipleMatches { index: usize },

    /// `element_at` given an out-of-range index.
    #[error("index {index} is out of range")]
    InvalidIndex { index: i64 },

    /// The requested state transition or in-place operation is not legal in
    /// the sequence's current mode.
    #[error("invalid operation for this sequence mode: {0}")]
    InvalidOperationOnMode(String),

    /// A numeric terminal was applied to a non-numeric item.
    #[error("{op} requires numeric items, found {found}")]
    InvalidItemType {
        op: &'static str,
        found: &'static str,
    },
}
