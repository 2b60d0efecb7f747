//! In-memory store — useful for testing and running without a Hippocampus
//! server.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use warden_core::error::MemoryError;
use warden_core::memory::{MemoryStore, SearchParams};

/// Namespaced key/text pairs held in process.
///
/// Search is keyword overlap rather than similarity: an entry matches when it
/// shares at least one lowercase word with the query. Entries are ranked by
/// how many query words they contain, and `top_k` caps the result count.
/// `epsilon` and `threshold` have no meaning here and are ignored.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    namespaces: Arc<RwLock<HashMap<String, Vec<(String, String)>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in a namespace.
    pub async fn count(&self, namespace: &str) -> usize {
        self.namespaces
            .read()
            .await
            .get(namespace)
            .map_or(0, Vec::len)
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn insert(&self, namespace: &str, key: &str, text: &str) -> Result<bool, MemoryError> {
        let mut namespaces = self.namespaces.write().await;
        let entries = namespaces.entry(namespace.to_string()).or_default();
        // HSET semantics: a repeated key overwrites.
        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = text.to_string(),
            None => entries.push((key.to_string(), text.to_string())),
        }
        Ok(true)
    }

    async fn search(
        &self,
        namespace: &str,
        query: &str,
        params: SearchParams,
    ) -> Result<Vec<String>, MemoryError> {
        let namespaces = self.namespaces.read().await;
        let Some(entries) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };

        let query_words = words(query);
        let mut scored: Vec<(usize, &String)> = entries
            .iter()
            .filter_map(|(_, text)| {
                let text_words = words(text);
                let hits = query_words.iter().filter(|q| text_words.contains(q)).count();
                (hits > 0).then_some((hits, text))
            })
            .collect();

        // Stable sort keeps insertion order among equal scores.
        scored.sort_by(|a, b| b.0.cmp(&a.0));
        Ok(scored
            .into_iter()
            .take(params.top_k)
            .map(|(_, text)| text.clone())
            .collect())
    }

    async fn delete(&self, namespace: &str) -> Result<bool, MemoryError> {
        self.namespaces.write().await.remove(namespace);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn insert_and_search() {
        let store = InMemoryStore::new();
        store
            .insert("a1", "company_hours", "Support is available Monday-Friday 9AM-5PM EST")
            .await
            .unwrap();
        store
            .insert("a1", "data_privacy", "Never share customer personal information")
            .await
            .unwrap();

        let results = store.search("a1", "what are your hours on monday", SearchParams::default()).await.unwrap();
        assert_eq!(results, vec!["Support is available Monday-Friday 9AM-5PM EST"]);
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = InMemoryStore::new();
        store.insert("a1", "k", "refund policy is 30 days").await.unwrap();
        let results = store.search("a2", "refund", SearchParams::default()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn ranks_by_overlap_and_caps_top_k() {
        let store = InMemoryStore::new();
        store.insert("a1", "one", "shipping").await.unwrap();
        store.insert("a1", "two", "shipping refund").await.unwrap();
        store.insert("a1", "three", "shipping refund policy").await.unwrap();

        let params = SearchParams {
            top_k: 2,
            ..SearchParams::default()
        };
        let results = store.search("a1", "shipping refund policy", params).await.unwrap();
        assert_eq!(results, vec!["shipping refund policy", "shipping refund"]);
    }

    #[tokio::test]
    async fn repeated_key_overwrites() {
        let store = InMemoryStore::new();
        store.insert("a1", "hours", "old hours").await.unwrap();
        store.insert("a1", "hours", "new hours").await.unwrap();
        assert_eq!(store.count("a1").await, 1);
    }

    #[tokio::test]
    async fn delete_drops_namespace() {
        let store = InMemoryStore::new();
        store.insert("a1", "k", "text").await.unwrap();
        assert!(store.delete("a1").await.unwrap());
        assert_eq!(store.count("a1").await, 0);
        assert!(store.ping().await.unwrap());
    }
}
