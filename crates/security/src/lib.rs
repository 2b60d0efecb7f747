//! Security layer for Warden — the per-turn defenses around the model.
//!
//! Provides:
//! - **Rate limiting**: sliding admission window per agent
//! - **Input defense**: canary-marker rejection and injection pattern screening
//! - **Behavior profiling**: rolling statistics and anomaly scoring
//! - **Canary protocol**: zero-width wrapping of suspicious input
//! - **Output defense**: canary-leak and forbidden-phrase checks on replies
//! - **Audit logging**: structured security event logging

pub mod audit;
pub mod canary;
pub mod input;
pub mod output;
pub mod profiler;
pub mod rate_limit;

pub use audit::{AuditEntry, AuditEvent, AuditLogger, AuditOutcome, AuditSink, TracingSink};
pub use input::{InjectionCategory, InputDefense, InputVerdict};
pub use output::{OutputDefense, OutputVerdict};
pub use profiler::{BehaviorProfile, BehaviorProfiler, RollingWindow};
pub use rate_limit::{RateWindow, THROTTLE_MESSAGE};
