//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation or decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The request path is empty or malformed.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// An uploaded file is not an image.
    #[error("only image files can be uploaded: {file_name} has type {content_type}")]
    NotAnImage {
        /// Name of the rejected file.
        file_name: String,
        /// Content type guessed for the file.
        content_type: String,
    },

    /// A response body did not have the expected shape.
    #[error("unexpected response format: {0}")]
    UnexpectedFormat(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;
