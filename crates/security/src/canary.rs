//! Canary protocol — zero-width markers around suspicious input.
//!
//! U+200B is reserved for internal use. User input containing it is rejected
//! outright, and a reply containing it means the model echoed wrapped input
//! back, which is treated as a leak.

/// The reserved zero-width space.
pub const CANARY_MARKER: char = '\u{200B}';

pub const CANARY_PREFIX: &str = "\u{200B}\u{200B}[SECURITY_CHECK]\u{200B}\u{200B}";
pub const CANARY_SUFFIX: &str = "\u{200B}\u{200B}[/SECURITY_CHECK]\u{200B}\u{200B}";

/// Wrap text flagged as anomalous.
pub fn wrap(text: &str) -> String {
    let mut out = String::with_capacity(CANARY_PREFIX.len() + text.len() + CANARY_SUFFIX.len());
    out.push_str(CANARY_PREFIX);
    out.push_str(text);
    out.push_str(CANARY_SUFFIX);
    out
}

pub fn contains_marker(text: &str) -> bool {
    text.contains(CANARY_MARKER)
}
