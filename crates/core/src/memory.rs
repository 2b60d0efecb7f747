//! Memory store trait — the associative store that mirrors each agent's
//! knowledge base.
//!
//! Every operation is scoped by a namespace (the agent identifier). The store
//! owns ranking and persistence; callers only insert, search, and drop whole
//! namespaces. Failures are reported through `MemoryError` and it is up to the
//! caller to degrade them (the knowledge registry treats them as `false` /
//! empty results).

use crate::error::MemoryError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Tuning knobs forwarded to the store's search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    /// Exploration radius used by the store's approximate search
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,

    /// Minimum similarity for a hit
    #[serde(default = "default_threshold")]
    pub threshold: f32,

    /// Maximum number of results
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_epsilon() -> f32 {
    0.3
}
fn default_threshold() -> f32 {
    0.5
}
fn default_top_k() -> usize {
    5
}

impl Default for SearchParams {
    fn default() -> Self {
        Self {
            epsilon: default_epsilon(),
            threshold: default_threshold(),
            top_k: default_top_k(),
        }
    }
}

/// The core MemoryStore trait.
///
/// Implementations: Hippocampus (RESP over TCP), in-memory (for testing).
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// The store name (e.g., "hippocampus", "in_memory").
    fn name(&self) -> &str;

    /// Insert `text` under `key` in the namespace. Returns whether the store
    /// acknowledged the write.
    async fn insert(&self, namespace: &str, key: &str, text: &str) -> std::result::Result<bool, MemoryError>;

    /// Search the namespace, best match first.
    async fn search(
        &self,
        namespace: &str,
        query: &str,
        params: SearchParams,
    ) -> std::result::Result<Vec<String>, MemoryError>;

    /// Drop the whole namespace.
    async fn delete(&self, namespace: &str) -> std::result::Result<bool, MemoryError>;

    /// Whether the store is reachable.
    async fn ping(&self) -> std::result::Result<bool, MemoryError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_params_defaults() {
        let params = SearchParams::default();
        assert!((params.epsilon - 0.3).abs() < f32::EPSILON);
        assert!((params.threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(params.top_k, 5);
    }

    #[test]
    fn search_params_partial_deserialize() {
        let params: SearchParams = serde_json::from_str(r#"{"top_k": 3}"#).unwrap();
        assert_eq!(params.top_k, 3);
        assert!((params.threshold - 0.5).abs() < f32::EPSILON);
    }
}
