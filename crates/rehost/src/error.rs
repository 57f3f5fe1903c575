//! Rehost Error Types
//!
//! Structured errors using `exn` for automatic location tracking. None of
//! these ever escape the pipeline: every kind is logged at its fallback
//! site and degrades to the original URL. The taxonomy exists so the log
//! says *why* an asset stayed where it was.

use derive_more::{Display, Error};

/// A rehost error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for rehost operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Actionable error categories.
///
/// These describe what the caller should *do*, not what went wrong
/// internally.
#[derive(Debug, Display, Error, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeout, connection or DNS failure.
    #[display("network failure: {_0}")]
    Network(#[error(not(source))] String),
    /// An image was expected but the server said otherwise.
    #[display("unexpected content type `{mime}` from {url}")]
    UnexpectedContentType { url: String, mime: String },
    /// The resource is too big to rehost.
    #[display("size limit exceeded for {url}: {size} bytes")]
    SizeLimitExceeded { url: String, size: u64 },
    /// An expected extraction pattern is absent: the remote site's template
    /// changed and the matching rule needs updating.
    #[display("layout changed at {host}: extraction pattern found nothing")]
    LayoutDrift { host: String },
    /// The hosting endpoint answered, but not with a destination URL.
    #[display("upload rejected: {_0}")]
    UploadRejected(#[error(not(source))] String),
    /// The configured destination-URL pattern does not compile.
    #[display("invalid destination pattern: {_0}")]
    InvalidPattern(#[error(not(source))] String),
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
