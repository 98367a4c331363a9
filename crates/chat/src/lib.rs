//! Bounded conversation history and prompt assembly.
//!
//! The vendor generation endpoint takes a single flattened prompt, so the
//! log keeps only the most recent turns and renders them as alternating
//! `User:`/`Assistant:` lines.

mod history;

pub use history::{ConversationLog, MAX_HISTORY, Role, Turn};
