//! Sliding-window rate limiting.

use chrono::{DateTime, Duration, Utc};
use std::collections::VecDeque;
use tracing::warn;
use warden_config::{DefenseConfig, MAX_RATE_WINDOW_SECS};

/// Reply sent when a turn is not admitted.
pub const THROTTLE_MESSAGE: &str = "I'm experiencing high demand. Please try again in a moment.";

/// Admission timestamps within the current window.
///
/// Holds at most `max` entries. Eviction is lazy: stale timestamps are only
/// dropped when the next admission is checked.
#[derive(Debug, Clone)]
pub struct RateWindow {
    window: Duration,
    max: usize,
    admissions: VecDeque<DateTime<Utc>>,
}

impl RateWindow {
    /// Windows longer than [`MAX_RATE_WINDOW_SECS`] are clamped to it.
    pub fn new(window_secs: u64, max: usize) -> Self {
        let secs = window_secs.min(MAX_RATE_WINDOW_SECS);
        let window = i64::try_from(secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or_else(Duration::zero);
        Self {
            window,
            max,
            admissions: VecDeque::new(),
        }
    }

    pub fn from_config(config: &DefenseConfig) -> Self {
        Self::new(config.rate_limit_window_secs, config.rate_limit_max)
    }

    /// Admit a turn at `now`. A rejection leaves the window untouched.
    pub fn admit(&mut self, agent_id: &str, now: DateTime<Utc>) -> bool {
        if let Some(cutoff) = now.checked_sub_signed(self.window) {
            while self.admissions.front().is_some_and(|t| *t < cutoff) {
                self.admissions.pop_front();
            }
        }

        if self.admissions.len() >= self.max {
            warn!(
                agent_id,
                in_window = self.admissions.len(),
                max = self.max,
                "Rate limit exceeded"
            );
            return false;
        }

        self.admissions.push_back(now);
        true
    }

    /// Admissions currently counted against the window.
    pub fn in_window(&self) -> usize {
        self.admissions.len()
    }
}
