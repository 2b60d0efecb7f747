//! Input defense — screens user text before it reaches the model.
//!
//! Two checks, in order:
//! 1. The reserved canary marker anywhere in the text rejects immediately.
//! 2. An ordered list of case-insensitive injection patterns. Every matching
//!    category is logged, a single rejection is returned.

use crate::canary;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

pub const CANARY_REJECTION: &str =
    "Your message contains invalid characters. Please rephrase your question.";

pub const INJECTION_REDIRECT: &str = "I detected a potential security issue with your message. \
I'm here to help with customer support. Please rephrase your question without special instructions.";

/// What an injection pattern is trying to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InjectionCategory {
    IgnoreInstruction,
    SystemOverride,
    RoleChange,
    RoleplayAttempt,
    DanJailbreak,
    HypotheticalBypass,
    JsonInjection,
    XmlInjection,
    ContextOverride,
    FutureOverride,
    OverrideAttempt,
    EncodingBypass,
}

impl InjectionCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IgnoreInstruction => "ignore_instruction",
            Self::SystemOverride => "system_override",
            Self::RoleChange => "role_change",
            Self::RoleplayAttempt => "roleplay_attempt",
            Self::DanJailbreak => "dan_jailbreak",
            Self::HypotheticalBypass => "hypothetical_bypass",
            Self::JsonInjection => "json_injection",
            Self::XmlInjection => "xml_injection",
            Self::ContextOverride => "context_override",
            Self::FutureOverride => "future_override",
            Self::OverrideAttempt => "override_attempt",
            Self::EncodingBypass => "encoding_bypass",
        }
    }
}

impl fmt::Display for InjectionCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checked in this order.
const INJECTION_PATTERNS: &[(&str, InjectionCategory)] = &[
    (
        r"(?i)ignore\s+(all\s+)?(previous|prior|above)\s+(instructions?|prompts?|commands?)",
        InjectionCategory::IgnoreInstruction,
    ),
    (r"(?i)\[?system\]?:", InjectionCategory::SystemOverride),
    (r"(?i)you\s+are\s+now\s+(a|an|DAN|evil)", InjectionCategory::RoleChange),
    (r"(?i)(pretend|act|roleplay)\s+(you|you're|as)", InjectionCategory::RoleplayAttempt),
    (r"(?i)DAN\s+.*(do\s+anything|no\s+restrictions?)", InjectionCategory::DanJailbreak),
    (r"(?i)hypothetical.*no\s+restrictions?", InjectionCategory::HypotheticalBypass),
    (r#"(?i)\}\}.*\{.*["']?system["']?:"#, InjectionCategory::JsonInjection),
    (r"(?i)</.*><\s*system>", InjectionCategory::XmlInjection),
    (r"(?i)new\s+(role|instructions?|context)", InjectionCategory::ContextOverride),
    (r"(?i)from\s+now\s+on.*ignore", InjectionCategory::FutureOverride),
    (r"(?i)override.*previous", InjectionCategory::OverrideAttempt),
    (r"(?i)base64.*ignore", InjectionCategory::EncodingBypass),
];

/// Result of screening one message.
#[derive(Debug, Clone, PartialEq)]
pub enum InputVerdict {
    /// Safe to forward; carries the original text.
    Clean(String),
    /// The text contained the reserved canary marker.
    CanaryMarker,
    /// One or more injection patterns matched.
    Injection { categories: Vec<InjectionCategory> },
}

impl InputVerdict {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Clean(_))
    }

    /// The text to carry forward: the input when clean, else the user-facing
    /// rejection.
    pub fn text(&self) -> &str {
        match self {
            Self::Clean(text) => text,
            Self::CanaryMarker => CANARY_REJECTION,
            Self::Injection { .. } => INJECTION_REDIRECT,
        }
    }
}

/// Per-agent input screening with an injection attempt counter.
#[derive(Debug)]
pub struct InputDefense {
    patterns: Vec<(Regex, InjectionCategory)>,
    injection_attempts: u64,
    last_injection_at: Option<DateTime<Utc>>,
}

impl Default for InputDefense {
    fn default() -> Self {
        Self::new()
    }
}

impl InputDefense {
    pub fn new() -> Self {
        let patterns = INJECTION_PATTERNS
            .iter()
            .filter_map(|(pattern, category)| Regex::new(pattern).ok().map(|re| (re, *category)))
            .collect();
        Self {
            patterns,
            injection_attempts: 0,
            last_injection_at: None,
        }
    }

    /// Screen `text`. Never fails; a rejection is reported in the verdict.
    pub fn sanitize(&mut self, agent_id: &str, text: &str, now: DateTime<Utc>) -> InputVerdict {
        if canary::contains_marker(text) {
            warn!(agent_id, "Canary marker found in user input");
            return InputVerdict::CanaryMarker;
        }

        let categories = self.matching_categories(text);
        if categories.is_empty() {
            return InputVerdict::Clean(text.to_string());
        }

        self.injection_attempts += 1;
        self.last_injection_at = Some(now);
        let names: Vec<&str> = categories.iter().map(InjectionCategory::as_str).collect();
        warn!(
            agent_id,
            categories = ?names,
            attempts = self.injection_attempts,
            "Injection attempt detected"
        );
        InputVerdict::Injection { categories }
    }

    /// All categories whose pattern matches, in check order.
    pub fn matching_categories(&self, text: &str) -> Vec<InjectionCategory> {
        self.patterns
            .iter()
            .filter(|(re, _)| re.is_match(text))
            .map(|(_, category)| *category)
            .collect()
    }

    pub fn injection_attempts(&self) -> u64 {
        self.injection_attempts
    }

    pub fn last_injection_at(&self) -> Option<DateTime<Utc>> {
        self.last_injection_at
    }
}
