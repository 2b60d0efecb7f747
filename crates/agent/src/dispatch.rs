//! Tool execution for the agent's tool loop.
//!
//! Every outcome is a string handed back to the model as a tool result.
//! Unknown tools and bad arguments are reported the same way so the loop
//! keeps going.

use crate::context::ContextManager;
use crate::knowledge::KnowledgeModuleRegistry;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_core::error::ToolError;
use warden_core::tool::ToolCall;
use warden_tools::{AgentTool, CustomerDirectory};

/// Executes decoded tool calls against one agent's state.
#[derive(Clone)]
pub struct ToolDispatcher {
    customers: Arc<dyn CustomerDirectory>,
}

impl std::fmt::Debug for ToolDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolDispatcher").finish_non_exhaustive()
    }
}

impl ToolDispatcher {
    pub fn new(customers: Arc<dyn CustomerDirectory>) -> Self {
        Self { customers }
    }

    /// Decode and run a raw call from the model.
    pub async fn dispatch_call(
        &self,
        call: &ToolCall,
        knowledge: &mut KnowledgeModuleRegistry,
        context: &ContextManager,
    ) -> String {
        match AgentTool::parse(call) {
            Ok(tool) => self.dispatch(tool, knowledge, context).await,
            Err(e @ ToolError::NotFound(_)) => {
                warn!(tool = %call.name, "Model called an unknown tool");
                e.to_string()
            }
            Err(e) => {
                warn!(tool = %call.name, error = %e, "Rejected tool arguments");
                format!("Error: {e}")
            }
        }
    }

    pub async fn dispatch(
        &self,
        tool: AgentTool,
        knowledge: &mut KnowledgeModuleRegistry,
        context: &ContextManager,
    ) -> String {
        debug!(tool = tool.name(), "Executing tool");
        match tool {
            AgentTool::SearchKnowledge { query } => {
                let results = knowledge.search(&query).await;
                if results.is_empty() {
                    return "No relevant knowledge found".into();
                }
                let lines: Vec<String> = results.iter().map(|r| format!("- {r}")).collect();
                format!("Found relevant knowledge:\n{}", lines.join("\n"))
            }
            AgentTool::AddKnowledge { key, content, module } => {
                if knowledge.add(&key, &content, &module).await {
                    format!("Successfully added knowledge: {key}")
                } else {
                    "Failed to add knowledge".into()
                }
            }
            AgentTool::CustomerLookup { customer_id } => match self.customers.lookup(&customer_id).await {
                Ok(summary) => summary,
                Err(e) => format!("Error: {e}"),
            },
            AgentTool::RecallConversation { query, max_depth } => {
                info!(query = %query, max_depth = ?max_depth, "Model searching conversation history");
                context.search_back(&query, max_depth)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::FailingStore;
    use serde_json::json;
    use warden_core::memory::{MemoryStore, SearchParams};
    use warden_core::message::Role;
    use warden_memory::InMemoryStore;
    use warden_tools::MockCustomerDirectory;

    fn dispatcher() -> ToolDispatcher {
        ToolDispatcher::new(Arc::new(MockCustomerDirectory))
    }

    async fn registry(store: Arc<dyn MemoryStore>) -> KnowledgeModuleRegistry {
        let mut registry = KnowledgeModuleRegistry::new("agent-1", store, SearchParams::default());
        registry.load_base().await;
        registry
    }

    fn call(name: &str, arguments: serde_json::Value) -> ToolCall {
        ToolCall {
            id: "call_0".into(),
            name: name.into(),
            arguments,
        }
    }

    #[tokio::test]
    async fn search_formats_hits() {
        let mut knowledge = registry(Arc::new(InMemoryStore::new())).await;
        let out = dispatcher()
            .dispatch_call(
                &call("search_knowledge", json!({"query": "support hours monday"})),
                &mut knowledge,
                &ContextManager::default(),
            )
            .await;
        assert!(out.starts_with("Found relevant knowledge:\n- "));
        assert!(out.contains("Monday-Friday 9AM-5PM EST"));
    }

    #[tokio::test]
    async fn search_without_hits() {
        let mut knowledge = registry(Arc::new(InMemoryStore::new())).await;
        let out = dispatcher()
            .dispatch(
                AgentTool::SearchKnowledge { query: "zeppelin".into() },
                &mut knowledge,
                &ContextManager::default(),
            )
            .await;
        assert_eq!(out, "No relevant knowledge found");
    }

    #[tokio::test]
    async fn add_knowledge_reports_key() {
        let mut knowledge = registry(Arc::new(InMemoryStore::new())).await;
        let out = dispatcher()
            .dispatch_call(
                &call("add_knowledge", json!({"key": "pref_sms", "content": "Prefers SMS"})),
                &mut knowledge,
                &ContextManager::default(),
            )
            .await;
        assert_eq!(out, "Successfully added knowledge: pref_sms");
        assert_eq!(knowledge.list_module("dynamic")[0].key, "pref_sms");
    }

    #[tokio::test]
    async fn add_knowledge_store_failure() {
        let mut knowledge = registry(Arc::new(FailingStore)).await;
        let out = dispatcher()
            .dispatch(
                AgentTool::AddKnowledge {
                    key: "k".into(),
                    content: "c".into(),
                    module: "dynamic".into(),
                },
                &mut knowledge,
                &ContextManager::default(),
            )
            .await;
        assert_eq!(out, "Failed to add knowledge");
    }

    #[tokio::test]
    async fn customer_lookup_uses_directory() {
        let mut knowledge = registry(Arc::new(InMemoryStore::new())).await;
        let out = dispatcher()
            .dispatch_call(
                &call("get_customer_request_data", json!({"customer_id": "C-7"})),
                &mut knowledge,
                &ContextManager::default(),
            )
            .await;
        assert_eq!(out, "Customer C-7: Premium user since 2023, 3 previous support tickets");
    }

    #[tokio::test]
    async fn recall_reads_search_view() {
        let mut knowledge = registry(Arc::new(InMemoryStore::new())).await;
        let mut context = ContextManager::default();
        context.append(Role::User, "My order number is 8812", chrono::Utc::now());
        let out = dispatcher()
            .dispatch_call(
                &call("search_conversation_history", json!({"query": "order number", "max_depth": 500})),
                &mut knowledge,
                &context,
            )
            .await;
        assert_eq!(out, "[user]: My order number is 8812");
    }

    #[tokio::test]
    async fn unknown_tool_and_bad_args_are_strings() {
        let mut knowledge = registry(Arc::new(InMemoryStore::new())).await;
        let context = ContextManager::default();
        let d = dispatcher();

        let out = d.dispatch_call(&call("rm_rf", json!({})), &mut knowledge, &context).await;
        assert_eq!(out, "Unknown tool: rm_rf");

        let out = d
            .dispatch_call(&call("search_knowledge", json!({"q": "typo"})), &mut knowledge, &context)
            .await;
        assert!(out.starts_with("Error: "));
        assert!(out.contains("query"));
    }
}
