//! Photox Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, and the layered client settings.

pub mod adapters;
pub mod config;
pub mod persistence;

pub use adapters::{MemoryKeyValueStore, ReqwestTransport};
pub use config::{ClientSettings, ConfigError};
pub use persistence::FileKeyValueStore;
