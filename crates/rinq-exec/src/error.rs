use thiserror::Error;

/// Canonical result for the dispatch/serialization layer.
pub type Result<T> = std::result::Result<T, ExecError>;

#[derive(Debug, Error)]
pub enum ExecError {
    /// Failure surfaced by the iteration protocol or an evaluator.
    #[error(transparent)]
    Seq(#[from] rinq_core::Error),

    #[error("unknown operator '{0}'")]
    UnknownOperator(String),

    #[error("unknown sequence type '{0}'")]
    UnknownType(String),

    #[error("bad parameter: {0}")]
    BadParameter(String),

    #[error("wire format error: {0}")]
    Wire(String),
}

impl From<serde_json::Error> for ExecError {
    fn from(e: serde_json::Error) -> Self {
        ExecError::Wire(e.to_string())
    }
}
