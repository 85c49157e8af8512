//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the client core and external systems.
//! Each port is a trait implemented by adapters in the infrastructure layer,
//! and by in-memory doubles in tests.

mod http_transport;
mod key_value_store;

pub use http_transport::{HttpTransport, TransportError};
pub use key_value_store::{KeyValueStore, StoreError};
