//! Error types for the defter-core library.

use thiserror::Error;

/// Main error type for the defter library.
#[derive(Error, Debug)]
pub enum DefterError {
    /// Recognition service error.
    #[error("service error: {0}")]
    Service(#[from] ServiceError),

    /// Response parsing error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Field extraction error.
    #[error("extraction error: {0}")]
    Extraction(#[from] ExtractionError),

    /// Tabular store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Image processing error.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// The batch was cancelled before this document started.
    #[error("batch aborted before processing")]
    Aborted,

    /// Worker task failed to join.
    #[error("worker task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}

/// Errors reported by the external recognition service.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// The service asked us to slow down. Retried with backoff.
    #[error("rate limited by recognition service")]
    RateLimited,

    /// The service could not be reached at all.
    #[error("recognition service unreachable: {0}")]
    Unavailable(String),

    /// The service answered with a non-success status. Not retried.
    #[error("recognition service failed: {0}")]
    Failed(String),
}

impl ServiceError {
    /// Whether this failure is worth retrying with backoff.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServiceError::RateLimited)
    }
}

/// Errors raised while parsing a recognition response body.
#[derive(Error, Debug)]
pub enum ParseError {
    /// Body is not valid JSON after code-fence stripping.
    #[error("response is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Statement extraction expected an array of records.
    #[error("expected an array of statement lines, got {0}")]
    NotAnArray(String),

    /// Response carried no usable payload at all.
    #[error("empty response body")]
    EmptyBody,
}

/// Errors related to field extraction.
#[derive(Error, Debug)]
pub enum ExtractionError {
    /// Required field is missing.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// Failed to parse a value.
    #[error("failed to parse {field}: {value}")]
    Parse { field: String, value: String },
}

/// Errors from the tabular store collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The requested partition does not exist.
    #[error("unknown ledger partition: {0}")]
    UnknownPartition(String),

    /// Read failure.
    #[error("failed to read partition {partition}: {reason}")]
    Read { partition: String, reason: String },

    /// Append failure.
    #[error("failed to append to partition {partition}: {reason}")]
    Append { partition: String, reason: String },
}

/// Result type for the defter library.
pub type Result<T> = std::result::Result<T, DefterError>;
