//! Session persistence and token refresh coordination.

mod refresh;
mod session_store;

pub use refresh::{
    Admission, PendingRequest, RefreshCoordinator, RefreshGuard, RefreshOutcome, RefreshTurn,
};
pub use session_store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, SessionStore, USER_KEY};
