//! LLM Provider implementations for Warden.
//!
//! All providers implement the `warden_core::Provider` trait.
//! `build_from_config` selects the backend named in the configuration.

pub mod ollama;
pub mod openai_compat;
pub mod router;

pub use ollama::OllamaProvider;
pub use openai_compat::OpenAiCompatProvider;
pub use router::build_from_config;
