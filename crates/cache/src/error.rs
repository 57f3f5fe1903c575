//! Link Cache Error Types
//!
//! Structured errors using `exn` for automatic location tracking.

use derive_more::{Display, Error};
use std::io::Error as IoError;

/// A cache error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for cache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    /// Underlying I/O error
    #[display("I/O error: {_0}")]
    Io(IoError),
}

impl From<IoError> for ErrorKind {
    fn from(err: IoError) -> Self {
        Self::Io(err)
    }
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        true
    }
}
