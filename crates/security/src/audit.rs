//! Audit logging — structured security event logging.
//!
//! Every defensive decision the agent takes during a turn is recorded here,
//! keyed by the agent it concerns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Entries kept in memory when no capacity is given.
pub const DEFAULT_AUDIT_CAPACITY: usize = 1000;

/// A single audit log entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    pub agent_id: String,
    pub outcome: AuditOutcome,
    pub details: Option<String>,
}

/// Types of auditable security events.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Turn refused by the rate window
    RateLimited,
    /// Input matched one or more injection patterns
    InjectionBlocked { categories: Vec<String> },
    /// Input carried the reserved canary marker
    CanaryInInput,
    /// Input scored above the anomaly threshold and was wrapped
    AnomalyFlagged { score: f64 },
    /// The model echoed the canary marker
    CanaryLeak,
    /// The model used a forbidden phrase
    ForbiddenPhrase { phrase: String },
    /// Conversation views were cleared
    ConversationReset,
}

/// Outcome of an audited decision.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Allowed,
    Flagged,
    Denied,
}

/// Where audit entries are written.
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: &AuditEntry);
}

/// Audit logger that keeps the most recent entries in memory and forwards
/// every entry to its sinks. Once `capacity` is reached the oldest entry is
/// evicted; sinks still see everything.
pub struct AuditLogger {
    entries: Mutex<VecDeque<AuditEntry>>,
    capacity: usize,
    sinks: Vec<Box<dyn AuditSink>>,
}

impl std::fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLogger")
            .field("entry_count", &self.count())
            .field("capacity", &self.capacity)
            .field("sink_count", &self.sinks.len())
            .finish()
    }
}

impl Default for AuditLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditLogger {
    /// Create a logger with no sinks.
    pub fn new() -> Self {
        Self::with_sinks(Vec::new())
    }

    pub fn with_sinks(sinks: Vec<Box<dyn AuditSink>>) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: DEFAULT_AUDIT_CAPACITY,
            sinks,
        }
    }

    /// Keep at most `capacity` entries in memory. Zero keeps none.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// A logger that emits every entry through `tracing`.
    pub fn tracing() -> Self {
        Self::with_sinks(vec![Box::new(TracingSink)])
    }

    // A poisoned lock only means a sink panicked mid-record; the entries are
    // still usable.
    fn lock(&self) -> MutexGuard<'_, VecDeque<AuditEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn log(
        &self,
        event: AuditEvent,
        agent_id: &str,
        outcome: AuditOutcome,
        details: Option<String>,
        now: DateTime<Utc>,
    ) {
        let entry = AuditEntry {
            timestamp: now,
            event,
            agent_id: agent_id.into(),
            outcome,
            details,
        };

        if self.capacity > 0 {
            let mut entries = self.lock();
            while entries.len() >= self.capacity {
                entries.pop_front();
            }
            entries.push_back(entry.clone());
        }

        for sink in &self.sinks {
            sink.record(&entry);
        }
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.lock().iter().cloned().collect()
    }

    pub fn entries_for(&self, agent_id: &str) -> Vec<AuditEntry> {
        self.lock()
            .iter()
            .filter(|e| e.agent_id == agent_id)
            .cloned()
            .collect()
    }

    pub fn entries_by_outcome(&self, outcome: &AuditOutcome) -> Vec<AuditEntry> {
        self.lock()
            .iter()
            .filter(|e| &e.outcome == outcome)
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

/// Emits entries via `tracing::info!`.
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&self, entry: &AuditEntry) {
        tracing::info!(
            event = ?entry.event,
            agent_id = %entry.agent_id,
            outcome = ?entry.outcome,
            details = ?entry.details,
            "AUDIT"
        );
    }
}
