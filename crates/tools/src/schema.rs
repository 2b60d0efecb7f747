//! Tool definitions advertised to the model on every round.

use crate::agent_tool::{ADD_KNOWLEDGE, CUSTOMER_LOOKUP, RECALL_CONVERSATION, SEARCH_KNOWLEDGE};
use serde_json::json;
use warden_core::provider::ToolDefinition;

/// The four tool schemas, in a stable order.
pub fn definitions() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: SEARCH_KNOWLEDGE.into(),
            description: "Search the agent's knowledge base for relevant information".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The search query to find relevant knowledge"
                    }
                },
                "required": ["query"]
            }),
        },
        ToolDefinition {
            name: ADD_KNOWLEDGE.into(),
            description: "Add new knowledge to the agent's knowledge base for future reference".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "key": {
                        "type": "string",
                        "description": "Unique key for this knowledge (e.g., 'customer_pref_darkmode')"
                    },
                    "content": {
                        "type": "string",
                        "description": "The knowledge content to store"
                    },
                    "module": {
                        "type": "string",
                        "description": "Module to store in (e.g., 'customer_preferences', 'product_knowledge')"
                    }
                },
                "required": ["key", "content", "module"]
            }),
        },
        ToolDefinition {
            name: CUSTOMER_LOOKUP.into(),
            description: "Retrieve customer request data and history".into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "customer_id": {
                        "type": "string",
                        "description": "The customer ID to lookup"
                    }
                },
                "required": ["customer_id"]
            }),
        },
        ToolDefinition {
            name: RECALL_CONVERSATION.into(),
            description: "Search through past conversation for specific context when user asks about \
something you discussed before. ONLY use this when: 1) User explicitly asks 'do you remember...', \
'did I mention...', 'what did we discuss about...', etc. 2) Information is NOT in the knowledge base. \
This tool searches the full conversation history with a safety limit of 4x normal context window."
                .into(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The specific topic or keyword to search for in conversation history"
                    },
                    "max_depth": {
                        "type": "integer",
                        "description": "Maximum number of messages to search back (default: 10, max: 40). \
Only increase if user asks about something from 'earlier' or 'a while ago'."
                    }
                },
                "required": ["query"]
            }),
        },
    ]
}
