use super::view::{ConversationEntry, ConversationView};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use warden_config::ContextConfig;
use warden_core::message::{Message, Role};

const TRUNCATION_MARKER: &str = "... [truncated]";
const MAX_RECALL_MATCHES: usize = 3;

/// Owns both history views for one conversation.
#[derive(Debug, Clone)]
pub struct ContextManager {
    context_view: ConversationView,
    search_view: ConversationView,
    window: usize,
    max_chars: usize,
    max_expansion: usize,
}

impl Default for ContextManager {
    fn default() -> Self {
        Self::from_config(&ContextConfig::default())
    }
}

impl ContextManager {
    pub fn new(window: usize, max_chars: usize, max_expansion: usize) -> Self {
        Self {
            context_view: ConversationView::default(),
            search_view: ConversationView::default(),
            window,
            max_chars,
            max_expansion,
        }
    }

    pub fn from_config(config: &ContextConfig) -> Self {
        Self::new(
            config.window_messages,
            config.max_chars_per_message,
            config.max_expansion,
        )
    }

    /// Record a message in both views. The context copy is capped.
    pub fn append(&mut self, role: Role, content: &str, now: DateTime<Utc>) {
        let capped = match truncate_chars(content, self.max_chars) {
            Some(head) => {
                debug!(
                    role = %role,
                    chars = content.chars().count(),
                    cap = self.max_chars,
                    "Capping message in context view"
                );
                format!("{head}{TRUNCATION_MARKER}")
            }
            None => content.to_string(),
        };

        self.context_view.push(ConversationEntry {
            role,
            content: capped,
            timestamp: now,
        });
        self.search_view.push(ConversationEntry {
            role,
            content: content.to_string(),
            timestamp: now,
        });
    }

    /// The last `window` context entries as provider messages.
    pub fn build_prompt_window(&self) -> Vec<Message> {
        self.context_view
            .last_n(self.window)
            .iter()
            .map(ConversationEntry::to_message)
            .collect()
    }

    /// Deepest recall the tool may request.
    pub fn max_recall_depth(&self) -> usize {
        self.window * self.max_expansion
    }

    /// Case-insensitive substring search of the search view, newest first.
    ///
    /// `max_depth` defaults to the prompt window and is clamped to
    /// [`max_recall_depth`](Self::max_recall_depth).
    pub fn search_back(&self, query: &str, max_depth: Option<usize>) -> String {
        if self.search_view.is_empty() {
            return "No conversation history available.".into();
        }

        let max_allowed = self.max_recall_depth();
        let mut depth = max_depth.unwrap_or(self.window);
        if depth > max_allowed {
            warn!(requested = depth, limit = max_allowed, "Recall depth exceeds limit, capping");
            depth = max_allowed;
        }

        let searched = depth.min(self.search_view.len());
        let needle = query.to_lowercase();
        let matches: Vec<String> = self
            .search_view
            .last_n(searched)
            .iter()
            .rev()
            .filter(|e| e.content.to_lowercase().contains(&needle))
            .map(|e| match truncate_chars(&e.content, self.max_chars) {
                Some(head) => format!("[{}]: {head}...", e.role),
                None => format!("[{}]: {}", e.role, e.content),
            })
            .collect();

        debug!(query, searched, matches = matches.len(), "Conversation recall");

        if matches.is_empty() {
            return if searched >= max_allowed {
                format!(
                    "Sorry, I couldn't find '{query}' in the conversation history \
                     (searched back {searched} messages, which is the maximum allowed)."
                )
            } else {
                format!(
                    "I couldn't find '{query}' in the recent conversation history \
                     (searched back {searched} messages)."
                )
            };
        }

        let mut result = matches[..matches.len().min(MAX_RECALL_MATCHES)].join("\n\n");
        if matches.len() > MAX_RECALL_MATCHES {
            result.push_str(&format!(
                "\n\n(Found {} more matches...)",
                matches.len() - MAX_RECALL_MATCHES
            ));
        }
        result
    }

    /// Empty both views.
    pub fn reset(&mut self) {
        self.context_view.clear();
        self.search_view.clear();
    }

    pub fn context_view(&self) -> &ConversationView {
        &self.context_view
    }

    pub fn search_view(&self) -> &ConversationView {
        &self.search_view
    }
}

/// The first `max` chars of `text`, or `None` if it already fits.
fn truncate_chars(text: &str, max: usize) -> Option<&str> {
    text.char_indices().nth(max).map(|(idx, _)| &text[..idx])
}
