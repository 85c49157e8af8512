//! Authentication errors

use thiserror::Error;

/// Authentication failures surfaced by the client.
///
/// Every variant except `InvalidCredentials` ends the session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// The login endpoint rejected the username or password.
    #[error("invalid credentials: {message}")]
    InvalidCredentials {
        /// Message reported by the backend.
        message: String,
    },

    /// A refresh was needed but no refresh token is stored.
    #[error("no refresh token")]
    MissingRefreshToken,

    /// The refresh call failed for a reason other than a 401.
    #[error("failed to refresh token: {message}")]
    RefreshFailed {
        /// Error description.
        message: String,
    },

    /// The refresh endpoint answered 401: the refresh token is no longer valid.
    #[error("refresh token rejected: {message}")]
    RefreshRejected {
        /// Message reported by the backend.
        message: String,
    },

    /// A request was still unauthorized after being replayed with a fresh token.
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Message reported by the backend.
        message: String,
    },

    /// The session was invalidated while the request was in flight.
    #[error("session expired, please log in again")]
    SessionExpired,

    /// The refresh this request was waiting on was abandoned before settling.
    #[error("token refresh was abandoned")]
    RefreshAbandoned,
}

impl AuthError {
    /// Returns true if the caller should send the user to the login surface.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        !matches!(self, Self::InvalidCredentials { .. })
    }
}
