//! Session lifecycle events.

/// Events broadcast by the client when the session changes.
///
/// The application layer subscribes to these instead of the client
/// navigating anywhere itself; `Invalidated` is the "go to login" signal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A login succeeded and tokens were stored.
    LoggedIn {
        /// Username that logged in.
        username: String,
    },
    /// The access token was replaced by a refresh.
    TokenRefreshed,
    /// The session could not be recovered and has been cleared.
    Invalidated {
        /// Why the session ended.
        reason: String,
    },
    /// The user logged out.
    LoggedOut,
}

impl SessionEvent {
    /// Returns true for the login-redirect signal.
    #[must_use]
    pub const fn is_invalidated(&self) -> bool {
        matches!(self, Self::Invalidated { .. })
    }
}
