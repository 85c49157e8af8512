//! HTTP response domain types

mod message;
mod spec;

pub use message::error_message;
pub use spec::{ApiResponse, StatusCode, unwrap_envelope};
