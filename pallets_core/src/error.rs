//! Error types shared by every pallets operation.
//!
//! Validation failures are reported before any state is built, so a caller
//! that receives an error never observes a half-constructed dataset or
//! palette.

use thiserror::Error;

/// Boxed error produced by an injected model, criterion or optimizer.
///
/// The training loop never inspects or rewraps these; they surface through
/// [`PalletsError::Compute`] with the original error intact.
pub type ComputeError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for pallets operations
pub type PalletsResult<T> = Result<T, PalletsError>;

/// Error type for pallets operations
#[derive(Debug, Error)]
pub enum PalletsError {
    /// A parameter was outside its accepted range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The backing image resource for `id` does not exist
    #[error("image {id} not found: {reason}")]
    NotFound { id: usize, reason: String },

    /// Index outside `[0, len)` on an indexable collection
    #[error("index {index} out of range for collection of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },

    /// Failure raised by a model, criterion or optimizer
    #[error(transparent)]
    Compute(ComputeError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PalletsError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        PalletsError::InvalidArgument(message.into())
    }

    /// True for caller mistakes (bad parameters, bad indices) as opposed to
    /// missing resources or compute failures.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, PalletsError::InvalidArgument(_))
    }
}
