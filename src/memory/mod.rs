/// Conversation history storage and token-budgeted trimming.
pub mod context_manager;

pub use context_manager::{estimate_tokens, trim_messages, ConversationMemory};
