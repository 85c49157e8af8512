//! Photox Domain - Core client types
//!
//! This crate defines the domain model for the Photox album client:
//! sessions and tokens, request/response descriptors, and the
//! response-shape rules the backend contract relies on.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod error;
pub mod id;
pub mod request;
pub mod response;

pub use auth::{AuthEndpoints, AuthError, RefreshedToken, Session, SessionEvent, TokenPair};
pub use error::{DomainError, DomainResult};
pub use id::generate_id_v7;
pub use request::{ApiRequest, FormPart, FormValue, HttpMethod, MultipartForm, RequestBody};
pub use response::{ApiResponse, StatusCode, error_message, unwrap_envelope};
