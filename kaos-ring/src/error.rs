//! Error types for kaos-ring.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, RingError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RingError {
    #[error("Invalid ring configuration: {0}")]
    InvalidConfig(String),

    #[error("Storage too small: need {required} bytes, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    #[error("Element size mismatch: ring stride is {expected} bytes, got {actual}")]
    ElementSize { expected: usize, actual: usize },

    /// Not enough free slots for the request. Retry later.
    #[error("Ring full")]
    Full,

    /// Not enough published entries for the request. Retry later.
    #[error("Ring empty")]
    Empty,
}

impl RingError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// True for conditions a caller can retry (capacity, not configuration).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Full | Self::Empty)
    }
}
