//! Authentication domain types

mod endpoints;
mod error;
mod event;
mod session;

pub use endpoints::{AuthEndpoints, LOGIN_PATH, REFRESH_PATH};
pub use error::AuthError;
pub use event::SessionEvent;
pub use session::{RefreshedToken, Session, TokenPair};
