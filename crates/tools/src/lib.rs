//! The agent's tool set.
//!
//! Four tools, closed: the model can search and extend the knowledge base,
//! look up a customer, and recall earlier conversation. Each call the model
//! makes is decoded into an [`AgentTool`] before anything runs, so unknown
//! names and bad arguments are caught at the boundary.

pub mod agent_tool;
pub mod customer;
pub mod schema;

pub use agent_tool::{AgentTool, DEFAULT_MODULE};
pub use customer::{CustomerDirectory, MockCustomerDirectory};
pub use schema::definitions;
