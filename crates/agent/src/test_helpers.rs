//! Shared test doubles for agent tests.

use async_trait::async_trait;
use std::sync::Mutex;
use warden_core::error::{MemoryError, ProviderError};
use warden_core::memory::{MemoryStore, SearchParams};
use warden_core::message::{Message, MessageToolCall};
use warden_core::provider::{Provider, ProviderRequest, ProviderResponse};

/// Returns scripted responses in order, then keeps repeating the last one.
/// Every request is recorded.
pub struct ScriptedProvider {
    script: Mutex<Vec<Result<ProviderResponse, ProviderError>>>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new(script: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        assert!(!script.is_empty(), "script needs at least one response");
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(vec![Ok(text_response(text))])
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        let mut script = self.script.lock().unwrap();
        if script.len() > 1 {
            script.remove(0)
        } else {
            script[0].clone()
        }
    }
}

pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: None,
        model: "scripted-model".into(),
    }
}

pub fn tool_response(calls: Vec<MessageToolCall>) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant_with_tools("", calls),
        usage: None,
        model: "scripted-model".into(),
    }
}

pub fn tool_call(id: &str, name: &str, args: serde_json::Value) -> MessageToolCall {
    MessageToolCall {
        id: id.into(),
        name: name.into(),
        arguments: args.to_string(),
    }
}

/// A store whose every operation fails.
pub struct FailingStore;

#[async_trait]
impl MemoryStore for FailingStore {
    fn name(&self) -> &str {
        "failing"
    }

    async fn insert(&self, _namespace: &str, _key: &str, _text: &str) -> Result<bool, MemoryError> {
        Err(MemoryError::Connection {
            address: "127.0.0.1:6379".into(),
            reason: "connection refused".into(),
        })
    }

    async fn search(&self, _namespace: &str, _query: &str, _params: SearchParams) -> Result<Vec<String>, MemoryError> {
        Err(MemoryError::Timeout { timeout_secs: 5 })
    }

    async fn delete(&self, _namespace: &str) -> Result<bool, MemoryError> {
        Err(MemoryError::QueryFailed("ERR read-only replica".into()))
    }
}

/// Wraps an [`InMemoryStore`](warden_memory::InMemoryStore) and delays every
/// insert into `slow_namespace`. `started` is notified when such an insert
/// begins.
pub struct SlowStore {
    pub inner: warden_memory::InMemoryStore,
    pub slow_namespace: String,
    pub delay: std::time::Duration,
    pub started: std::sync::Arc<tokio::sync::Notify>,
}

#[async_trait]
impl MemoryStore for SlowStore {
    fn name(&self) -> &str {
        "slow"
    }

    async fn insert(&self, namespace: &str, key: &str, text: &str) -> Result<bool, MemoryError> {
        if namespace == self.slow_namespace {
            self.started.notify_one();
            tokio::time::sleep(self.delay).await;
        }
        self.inner.insert(namespace, key, text).await
    }

    async fn search(&self, namespace: &str, query: &str, params: SearchParams) -> Result<Vec<String>, MemoryError> {
        self.inner.search(namespace, query, params).await
    }

    async fn delete(&self, namespace: &str) -> Result<bool, MemoryError> {
        self.inner.delete(namespace).await
    }
}
