//! Modular knowledge base.
//!
//! Knowledge is partitioned into named modules. The registry keeps the local
//! index (what the agent knows it stored) and mirrors every node into the
//! associative memory store under the agent's namespace, which serves search.
//!
//! Store failures never surface: inserts degrade to `false`, searches to an
//! empty result, both with a warning.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use warden_core::memory::{MemoryStore, SearchParams};

/// Modules every agent starts with, in display order.
pub const STANDARD_MODULES: [&str; 4] = ["base", "customer_preferences", "product_knowledge", "conversation_history"];

pub const BASE_MODULE: &str = "base";

const BASE_NODES: [(&str, &str); 4] = [
    (
        "greeting_protocol",
        "Always greet customers warmly and ask how you can help them today",
    ),
    (
        "company_hours",
        "Our customer support is available Monday-Friday 9AM-5PM EST",
    ),
    (
        "escalation_protocol",
        "If customer is frustrated or issue is complex, offer to escalate to senior support",
    ),
    (
        "data_privacy",
        "Never share customer personal information. All data is encrypted and private",
    ),
];

/// One fact in a module.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KnowledgeNode {
    pub key: String,
    pub content: String,
    pub module: String,
    pub active: bool,
}

impl KnowledgeNode {
    pub fn new(key: impl Into<String>, content: impl Into<String>, module: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            content: content.into(),
            module: module.into(),
            active: true,
        }
    }
}

#[derive(Debug, Clone)]
struct Module {
    name: String,
    nodes: Vec<KnowledgeNode>,
}

/// Per-agent module index backed by a [`MemoryStore`] namespace.
pub struct KnowledgeModuleRegistry {
    namespace: String,
    store: Arc<dyn MemoryStore>,
    params: SearchParams,
    modules: Vec<Module>,
}

impl std::fmt::Debug for KnowledgeModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeModuleRegistry")
            .field("namespace", &self.namespace)
            .field("store", &self.store.name())
            .field("modules", &self.module_names())
            .finish()
    }
}

impl KnowledgeModuleRegistry {
    /// An index with the standard modules, all empty. Call
    /// [`load_base`](Self::load_base) to seed it.
    pub fn new(namespace: impl Into<String>, store: Arc<dyn MemoryStore>, params: SearchParams) -> Self {
        Self {
            namespace: namespace.into(),
            store,
            params,
            modules: standard_modules(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Seed the base module and mirror it into the store.
    ///
    /// Base nodes are indexed even when the store write fails; they describe
    /// how the agent behaves and must stay listed.
    pub async fn load_base(&mut self) {
        let mut mirrored = 0;
        for (key, content) in BASE_NODES {
            if self.insert_into_store(key, content).await {
                mirrored += 1;
            }
            self.push_node(KnowledgeNode::new(key, content, BASE_MODULE));
        }
        info!(
            namespace = %self.namespace,
            nodes = BASE_NODES.len(),
            mirrored,
            "Loaded base knowledge module"
        );
    }

    /// Store a fact. The node is indexed only if the store acknowledged it.
    /// Unknown modules are created on demand.
    pub async fn add(&mut self, key: &str, content: &str, module: &str) -> bool {
        if !self.insert_into_store(key, content).await {
            return false;
        }
        self.push_node(KnowledgeNode::new(key, content, module));
        debug!(namespace = %self.namespace, key, module, "Added knowledge node");
        true
    }

    /// Nodes in a module, oldest first. Unknown modules are empty.
    pub fn list_module(&self, module: &str) -> &[KnowledgeNode] {
        self.modules
            .iter()
            .find(|m| m.name == module)
            .map(|m| m.nodes.as_slice())
            .unwrap_or(&[])
    }

    /// The newest active node for a key within a module.
    pub fn lookup(&self, module: &str, key: &str) -> Option<&KnowledgeNode> {
        self.list_module(module)
            .iter()
            .rev()
            .find(|n| n.key == key && n.active)
    }

    /// Soft-delete every node with `key` in `module`. Returns whether any
    /// active node was changed. The store copy is left in place.
    pub fn deactivate(&mut self, module: &str, key: &str) -> bool {
        let Some(m) = self.modules.iter_mut().find(|m| m.name == module) else {
            return false;
        };
        let mut changed = false;
        for node in m.nodes.iter_mut().filter(|n| n.key == key && n.active) {
            node.active = false;
            changed = true;
        }
        changed
    }

    /// Search the store namespace.
    pub async fn search(&self, query: &str) -> Vec<String> {
        match self.store.search(&self.namespace, query, self.params).await {
            Ok(results) => results,
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "Knowledge search failed");
                Vec::new()
            }
        }
    }

    /// Drop the namespace and every module, then reload the base module.
    pub async fn clear(&mut self) {
        if let Err(e) = self.store.delete(&self.namespace).await {
            warn!(namespace = %self.namespace, error = %e, "Failed to delete knowledge namespace");
        }
        self.modules = standard_modules();
        self.load_base().await;
        info!(namespace = %self.namespace, "Knowledge reset to base module");
    }

    /// Drop the store namespace without touching the local index.
    pub async fn drop_namespace(&self) -> bool {
        match self.store.delete(&self.namespace).await {
            Ok(deleted) => deleted,
            Err(e) => {
                warn!(namespace = %self.namespace, error = %e, "Failed to delete knowledge namespace");
                false
            }
        }
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    /// `(module, active node count)` in module order.
    pub fn active_counts(&self) -> Vec<(String, usize)> {
        self.modules
            .iter()
            .map(|m| (m.name.clone(), m.nodes.iter().filter(|n| n.active).count()))
            .collect()
    }

    async fn insert_into_store(&self, key: &str, content: &str) -> bool {
        match self.store.insert(&self.namespace, key, content).await {
            Ok(ok) => ok,
            Err(e) => {
                warn!(namespace = %self.namespace, key, error = %e, "Knowledge insert failed");
                false
            }
        }
    }

    // The module is registered before the node is appended.
    fn push_node(&mut self, node: KnowledgeNode) {
        let idx = match self.modules.iter().position(|m| m.name == node.module) {
            Some(idx) => idx,
            None => {
                self.modules.push(Module {
                    name: node.module.clone(),
                    nodes: Vec::new(),
                });
                self.modules.len() - 1
            }
        };
        self.modules[idx].nodes.push(node);
    }
}

fn standard_modules() -> Vec<Module> {
    STANDARD_MODULES
        .iter()
        .map(|name| Module {
            name: (*name).to_string(),
            nodes: Vec::new(),
        })
        .collect()
}
