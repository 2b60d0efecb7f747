//! Dual-resolution conversation history.
//!
//! Every message lands in two views:
//! - the **context view**, capped per entry and windowed when a prompt is
//!   assembled, and
//! - the **search view**, kept at full fidelity for the recall tool.

mod manager;
mod view;

pub use manager::ContextManager;
pub use view::{ConversationEntry, ConversationView};
