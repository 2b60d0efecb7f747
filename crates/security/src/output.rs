//! Output defense — checks the model's final text before it is stored or
//! returned.

use crate::canary;
use tracing::warn;
use warden_config::DefenseConfig;

pub const CANARY_LEAK_REPLY: &str = "I apologize, but I detected a security issue with my response. \
Let me reset and help you properly. How can I assist you today?";

pub const FORBIDDEN_PHRASE_REPLY: &str = "I apologize, but I need to reset this conversation for security reasons. \
How can I help you with customer support today?";

/// Result of validating one reply.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputVerdict {
    Accepted(String),
    /// The reply contains the reserved canary marker.
    CanaryLeak,
    /// The reply contains a forbidden phrase (lowercased).
    ForbiddenPhrase(String),
}

impl OutputVerdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Accepted(_))
    }

    /// The reply when accepted, else the reassurance message.
    pub fn text(&self) -> &str {
        match self {
            Self::Accepted(text) => text,
            Self::CanaryLeak => CANARY_LEAK_REPLY,
            Self::ForbiddenPhrase(_) => FORBIDDEN_PHRASE_REPLY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputDefense {
    forbidden_phrases: Vec<String>,
}

impl Default for OutputDefense {
    fn default() -> Self {
        Self::new(warden_config::default_forbidden_phrases())
    }
}

impl OutputDefense {
    pub fn new(phrases: Vec<String>) -> Self {
        Self {
            forbidden_phrases: phrases
                .into_iter()
                .map(|p| p.to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
        }
    }

    pub fn from_config(config: &DefenseConfig) -> Self {
        Self::new(config.forbidden_phrases.clone())
    }

    /// Validate a reply. The canary check runs first.
    pub fn validate_response(&self, agent_id: &str, text: &str) -> OutputVerdict {
        if canary::contains_marker(text) {
            warn!(agent_id, "Canary marker leaked into model output");
            return OutputVerdict::CanaryLeak;
        }

        let lowered = text.to_lowercase();
        if let Some(phrase) = self.forbidden_phrases.iter().find(|p| lowered.contains(p.as_str())) {
            warn!(agent_id, phrase = %phrase, "Forbidden phrase in model output");
            return OutputVerdict::ForbiddenPhrase(phrase.clone());
        }

        OutputVerdict::Accepted(text.to_string())
    }
}
