//! Photox Application - Client core, ports and services
//!
//! This crate defines the application layer with:
//! - Port traits for the HTTP transport and the key-value session store
//! - The authenticated API client with single-flight token refresh
//! - Thin album, image and user services built on that client
//! - Application-level error handling

pub mod auth;
pub mod client;
pub mod error;
pub mod ports;
pub mod services;

#[cfg(test)]
pub(crate) mod mocks;

pub use auth::{RefreshCoordinator, SessionStore};
pub use client::ApiClient;
pub use error::{ClientError, ClientResult};
pub use ports::{HttpTransport, KeyValueStore, StoreError, TransportError};
pub use services::{AlbumService, AuthService, ImageService, ImageUpload, ListQuery};
