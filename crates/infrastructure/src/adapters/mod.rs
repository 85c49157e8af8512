//! Port adapters.

mod memory_store;
mod reqwest_transport;

pub use memory_store::MemoryKeyValueStore;
pub use reqwest_transport::ReqwestTransport;
