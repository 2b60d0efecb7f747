//! # Warden Core
//!
//! Domain types, traits, and error definitions for the Warden agent front-end.
//! This crate carries no I/O of its own. It defines the boundary contracts
//! (LLM provider, associative memory store, tool surface) that the other
//! crates implement or consume.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here. Implementations live in their
//! respective crates. This enables:
//! - Swapping the provider or memory store via configuration
//! - Easy testing with scripted/in-memory implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{Error, MemoryError, ProviderError, Result, ToolError};
pub use memory::{MemoryStore, SearchParams};
pub use message::{Message, MessageToolCall, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse, ToolDefinition, Usage};
pub use tool::ToolCall;
