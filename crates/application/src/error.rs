//! Application error types

use photox_domain::{AuthError, DomainError};
use thiserror::Error;

use crate::ports::{StoreError, TransportError};

/// Errors returned by the API client and the services built on it.
#[derive(Debug, Error)]
pub enum ClientError {
    /// No response was received.
    #[error("network error: {0}")]
    Network(#[from] TransportError),

    /// Credentials are missing, invalid or could not be refreshed.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// The backend answered with a non-2xx status.
    #[error("HTTP {status}: {message}")]
    Http {
        /// Response status.
        status: u16,
        /// Best-effort message extracted from the body.
        message: String,
        /// Raw response body.
        body: String,
    },

    /// A response body could not be decoded to the expected shape.
    #[error("unexpected response format: {0}")]
    Format(String),

    /// The session store failed.
    #[error("session storage error: {0}")]
    Storage(#[from] StoreError),

    /// The request was rejected before being sent.
    #[error("invalid request: {0}")]
    InvalidRequest(DomainError),
}

impl From<DomainError> for ClientError {
    fn from(error: DomainError) -> Self {
        match error {
            DomainError::UnexpectedFormat(message) => Self::Format(message),
            other => Self::InvalidRequest(other),
        }
    }
}

impl ClientError {
    /// Returns the HTTP status for `Http` errors.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true for a 404 response.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::Http { status: 404, .. })
    }

    /// Returns true for a 403 response.
    #[must_use]
    pub const fn is_forbidden(&self) -> bool {
        matches!(self, Self::Http { status: 403, .. })
    }

    /// Returns true for a 5xx response.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Http { status: 500..=599, .. })
    }

    /// Returns true if the user has to log in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        match self {
            Self::Auth(error) => error.requires_login(),
            _ => false,
        }
    }
}

/// Result type alias for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
