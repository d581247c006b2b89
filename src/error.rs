use thiserror::Error;

/// Errors surfaced by the engine and its host boundary.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Fewer than two layer sizes, or a zero-sized layer.
    #[error("invalid topology: {0}")]
    InvalidTopology(String),

    /// A batch, buffer or output slice does not match the network's shape.
    #[error("{what}: expected {expected}, got {actual}")]
    DimensionMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Scratch or parameter storage could not be reserved.
    #[error("failed to allocate {values} values")]
    Allocation { values: usize },

    /// A host buffer is shorter than its header declares, or carries a negative count.
    #[error("malformed buffer: {0}")]
    MalformedBuffer(String),

    /// Accuracy scoring or training was requested on samples without ground truth.
    #[error("samples carry no expected outputs or expected indices")]
    MissingExpectations,

    #[error("unknown handle {0}")]
    UnknownHandle(u64),
}

pub type Result<T> = std::result::Result<T, Error>;
