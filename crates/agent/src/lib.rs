//! The defended customer-support agent.
//!
//! Each turn runs through a fixed pipeline:
//!
//! 1. **Rate check** against the agent's sliding window
//! 2. **Sanitize** for the canary marker and injection patterns
//! 3. **Score** against the behavior baseline; wrap anomalous text in canary markers
//! 4. **Store** the user turn in both history views
//! 5. **Tool loop**: call the model, run requested tools, repeat (bounded)
//! 6. **Validate** the reply; a compromised reply resets the conversation
//! 7. **Store** and return the reply
//!
//! Agents are kept per customer id in an [`AgentRegistry`].

pub mod context;
pub mod dispatch;
pub mod knowledge;
pub mod orchestrator;
pub mod prompt;
pub mod registry;
pub mod services;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use context::{ContextManager, ConversationEntry, ConversationView};
pub use dispatch::ToolDispatcher;
pub use knowledge::{KnowledgeModuleRegistry, KnowledgeNode};
pub use orchestrator::{AgentStatus, CustomerAgent, ModuleStatus, TurnKind, TurnOutcome};
pub use registry::{AgentRegistry, SharedAgent};
pub use services::AgentServices;
