//! Memory store implementations for Warden.
//!
//! - [`HippocampusClient`] speaks RESP over TCP to a Hippocampus server.
//! - [`InMemoryStore`] keeps namespaces in process; used by tests and for
//!   running without a store.

pub mod hippocampus;
pub mod in_memory;
pub mod resp;

pub use hippocampus::HippocampusClient;
pub use in_memory::InMemoryStore;
