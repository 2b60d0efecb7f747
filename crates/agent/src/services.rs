//! Collaborators shared by every agent.

use std::sync::Arc;
use warden_config::AppConfig;
use warden_core::memory::{MemoryStore, SearchParams};
use warden_core::provider::Provider;
use warden_security::AuditLogger;
use warden_tools::{CustomerDirectory, MockCustomerDirectory};

/// External services and configuration an agent is built from. Cheap to
/// clone; every field is shared.
#[derive(Clone)]
pub struct AgentServices {
    pub provider: Arc<dyn Provider>,
    pub store: Arc<dyn MemoryStore>,
    pub customers: Arc<dyn CustomerDirectory>,
    pub audit: Arc<AuditLogger>,
    pub config: Arc<AppConfig>,
}

impl std::fmt::Debug for AgentServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentServices")
            .field("provider", &self.provider.name())
            .field("store", &self.store.name())
            .field("audit", &self.audit)
            .finish_non_exhaustive()
    }
}

impl AgentServices {
    /// Services with the mock customer directory and a tracing audit log
    /// bounded by `defense.audit_capacity`.
    pub fn new(provider: Arc<dyn Provider>, store: Arc<dyn MemoryStore>, config: AppConfig) -> Self {
        Self {
            provider,
            store,
            customers: Arc::new(MockCustomerDirectory),
            audit: Arc::new(AuditLogger::tracing().with_capacity(config.defense.audit_capacity)),
            config: Arc::new(config),
        }
    }

    pub fn with_customers(mut self, customers: Arc<dyn CustomerDirectory>) -> Self {
        self.customers = customers;
        self
    }

    pub fn with_audit(mut self, audit: Arc<AuditLogger>) -> Self {
        self.audit = audit;
        self
    }

    pub fn search_params(&self) -> SearchParams {
        SearchParams {
            epsilon: self.config.memory.epsilon,
            threshold: self.config.memory.threshold,
            top_k: self.config.memory.top_k,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::ScriptedProvider;
    use warden_memory::InMemoryStore;

    #[test]
    fn audit_log_is_bounded_by_config() {
        let mut config = AppConfig::default();
        config.defense.audit_capacity = 25;
        let services = AgentServices::new(
            Arc::new(ScriptedProvider::text("ok")),
            Arc::new(InMemoryStore::new()),
            config,
        );
        assert_eq!(services.audit.capacity(), 25);
        assert_eq!(services.search_params().top_k, services.config.memory.top_k);
    }
}
