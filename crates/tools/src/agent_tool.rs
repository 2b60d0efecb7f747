//! Decoding model tool calls into the closed [`AgentTool`] set.

use serde_json::Value;
use warden_core::error::ToolError;
use warden_core::tool::ToolCall;

pub const SEARCH_KNOWLEDGE: &str = "search_knowledge";
pub const ADD_KNOWLEDGE: &str = "add_knowledge";
pub const CUSTOMER_LOOKUP: &str = "get_customer_request_data";
pub const RECALL_CONVERSATION: &str = "search_conversation_history";

/// Module used by `add_knowledge` when the model leaves it out.
pub const DEFAULT_MODULE: &str = "dynamic";

/// A decoded tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentTool {
    SearchKnowledge {
        query: String,
    },
    AddKnowledge {
        key: String,
        content: String,
        module: String,
    },
    CustomerLookup {
        customer_id: String,
    },
    RecallConversation {
        query: String,
        /// Advisory; the context manager clamps it.
        max_depth: Option<usize>,
    },
}

impl AgentTool {
    pub fn name(&self) -> &'static str {
        match self {
            Self::SearchKnowledge { .. } => SEARCH_KNOWLEDGE,
            Self::AddKnowledge { .. } => ADD_KNOWLEDGE,
            Self::CustomerLookup { .. } => CUSTOMER_LOOKUP,
            Self::RecallConversation { .. } => RECALL_CONVERSATION,
        }
    }

    /// Decode a call. Unknown names are `ToolError::NotFound`; missing or
    /// mistyped required arguments are `ToolError::InvalidArguments`.
    pub fn parse(call: &ToolCall) -> Result<Self, ToolError> {
        let args = &call.arguments;
        match call.name.as_str() {
            SEARCH_KNOWLEDGE => Ok(Self::SearchKnowledge {
                query: required_str(args, "query")?,
            }),
            ADD_KNOWLEDGE => Ok(Self::AddKnowledge {
                key: required_str(args, "key")?,
                content: required_str(args, "content")?,
                module: args["module"]
                    .as_str()
                    .map(str::trim)
                    .filter(|m| !m.is_empty())
                    .unwrap_or(DEFAULT_MODULE)
                    .to_string(),
            }),
            CUSTOMER_LOOKUP => Ok(Self::CustomerLookup {
                customer_id: required_str(args, "customer_id")?,
            }),
            RECALL_CONVERSATION => Ok(Self::RecallConversation {
                query: required_str(args, "query")?,
                max_depth: depth_arg(&args["max_depth"]),
            }),
            other => Err(ToolError::NotFound(other.to_string())),
        }
    }
}

fn required_str(args: &Value, name: &str) -> Result<String, ToolError> {
    match &args[name] {
        Value::String(s) => Ok(s.clone()),
        // Models occasionally send ids as bare numbers.
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Err(ToolError::InvalidArguments(format!("Missing '{name}' argument"))),
        _ => Err(ToolError::InvalidArguments(format!("'{name}' must be a string"))),
    }
}

fn depth_arg(value: &Value) -> Option<usize> {
    match value {
        Value::Number(n) => n.as_u64().map(|d| d as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
