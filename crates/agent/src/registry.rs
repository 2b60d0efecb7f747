//! Keyed store of live agents.
//!
//! Agents are created on first use and live until explicitly removed. Each
//! sits behind its own mutex, so turns for one id run one at a time while
//! different ids proceed in parallel.

use crate::orchestrator::CustomerAgent;
use crate::services::AgentServices;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

pub type SharedAgent = Arc<Mutex<CustomerAgent>>;

#[derive(Debug)]
pub struct AgentRegistry {
    services: AgentServices,
    agents: RwLock<HashMap<String, SharedAgent>>,
}

impl AgentRegistry {
    pub fn new(services: AgentServices) -> Self {
        Self {
            services,
            agents: RwLock::new(HashMap::new()),
        }
    }

    pub fn services(&self) -> &AgentServices {
        &self.services
    }

    /// The agent for `agent_id`, creating it if needed.
    ///
    /// The agent is built without holding the map lock, so a slow store
    /// never stalls other ids. If two callers race, the first insert wins
    /// and the other copy is dropped.
    pub async fn get_or_create(&self, agent_id: &str) -> SharedAgent {
        if let Some(agent) = self.agents.read().await.get(agent_id) {
            return agent.clone();
        }

        let built = Arc::new(Mutex::new(CustomerAgent::new(agent_id, self.services.clone()).await));
        self.agents
            .write()
            .await
            .entry(agent_id.to_string())
            .or_insert(built)
            .clone()
    }

    pub async fn get(&self, agent_id: &str) -> Option<SharedAgent> {
        self.agents.read().await.get(agent_id).cloned()
    }

    /// Forget an agent and drop its knowledge namespace. Returns whether the
    /// agent existed.
    pub async fn remove(&self, agent_id: &str) -> bool {
        let Some(agent) = self.agents.write().await.remove(agent_id) else {
            return false;
        };
        let dropped = agent.lock().await.drop_knowledge().await;
        info!(agent_id, namespace_dropped = dropped, "Agent removed");
        true
    }

    /// Known agent ids, sorted.
    pub async fn list(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }
}
