use chrono::{DateTime, Utc};
use serde::Serialize;
use warden_core::message::{Message, Role};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConversationEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ConversationEntry {
    pub fn to_message(&self) -> Message {
        Message {
            timestamp: self.timestamp,
            ..Message::new(self.role, self.content.clone())
        }
    }
}

/// Append-only list of entries. Cleared only as a whole.
#[derive(Debug, Clone, Default)]
pub struct ConversationView {
    entries: Vec<ConversationEntry>,
}

impl ConversationView {
    pub fn push(&mut self, entry: ConversationEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ConversationEntry] {
        &self.entries
    }

    /// The last `n` entries, oldest first.
    pub fn last_n(&self, n: usize) -> &[ConversationEntry] {
        let start = self.entries.len().saturating_sub(n);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
