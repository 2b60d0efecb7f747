//! Tool call types shared between the provider boundary and the dispatcher.
//!
//! The set of tools itself is closed and lives in `warden-tools`; this module
//! only carries the decoded request the model made.

use crate::message::MessageToolCall;
use serde::{Deserialize, Serialize};

/// A request to execute a tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Unique call ID (matches the LLM's tool_call.id)
    pub id: String,

    /// Name of the tool to execute
    pub name: String,

    /// Arguments as a JSON value
    pub arguments: serde_json::Value,
}

impl From<&MessageToolCall> for ToolCall {
    /// Decode the provider's raw argument string. Malformed JSON becomes an
    /// empty object so the dispatcher reports missing arguments instead of the
    /// loop aborting.
    fn from(tc: &MessageToolCall) -> Self {
        let arguments = serde_json::from_str(&tc.arguments)
            .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new()));
        Self {
            id: tc.id.clone(),
            name: tc.name.clone(),
            arguments,
        }
    }
}
