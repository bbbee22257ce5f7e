//! Conversation memory and context trimming
//!
//! [`ConversationMemory`] keeps the per-thread message log that lets a user
//! continue a conversation across separate invocations. [`trim_messages`]
//! is the pre-model hook: before every model call the history is cut down
//! to a token budget so long-running conversations never overflow the
//! context window.

use parking_lot::RwLock;
use std::collections::HashMap;

use crate::types::{Message, MessageRole};

/// Approximate token count for a message (4 chars per token).
pub fn estimate_tokens(message: &Message) -> usize {
    message.content.len() / 4
}

/// Trim a conversation to fit a token budget.
///
/// Keeps the leading system message, then the longest suffix of whole
/// messages that fits in the remaining budget. Messages are never split.
/// When the kept suffix contains any user turn, it is advanced to start on
/// one, so the retained window always restarts context at a human message.
pub fn trim_messages(messages: &[Message], max_tokens: usize) -> Vec<Message> {
    let (system, rest): (Option<&Message>, &[Message]) = match messages.first() {
        Some(first) if first.role == MessageRole::System => (Some(first), &messages[1..]),
        _ => (None, messages),
    };

    let system_tokens = system.map(estimate_tokens).unwrap_or(0);
    let budget = max_tokens.saturating_sub(system_tokens);

    // Longest suffix of whole messages within the budget
    let mut start = rest.len();
    let mut used = 0;
    while start > 0 {
        let tokens = estimate_tokens(&rest[start - 1]);
        if used + tokens > budget {
            break;
        }
        used += tokens;
        start -= 1;
    }

    // Restart on a user turn when the window has one
    if rest[start..].iter().any(|m| m.role == MessageRole::User) {
        while start < rest.len() && rest[start].role != MessageRole::User {
            start += 1;
        }
    }

    let mut trimmed = Vec::with_capacity(1 + rest.len() - start);
    if let Some(system) = system {
        trimmed.push(system.clone());
    }
    trimmed.extend(rest[start..].iter().cloned());

    trimmed
}

/// Per-thread conversation log.
///
/// Appends preserve strict turn order. Concurrent turns for the same thread
/// id are not serialized here; transports keep at most one invocation in
/// flight per thread.
#[derive(Default)]
pub struct ConversationMemory {
    threads: RwLock<HashMap<String, Vec<Message>>>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded history for a thread, oldest first.
    pub fn history(&self, thread_id: &str) -> Vec<Message> {
        self.threads
            .read()
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Append a completed turn's messages to a thread.
    pub fn append(&self, thread_id: &str, messages: &[Message]) {
        self.threads
            .write()
            .entry(thread_id.to_string())
            .or_default()
            .extend_from_slice(messages);
    }

    pub fn clear(&self, thread_id: &str) {
        self.threads.write().remove(thread_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn msg(role: MessageRole, len: usize) -> Message {
        let content = "x".repeat(len);
        match role {
            MessageRole::System => Message::system(content),
            MessageRole::User => Message::user(content),
            MessageRole::Assistant => Message::assistant(content),
            MessageRole::Tool => Message::tool(content, "call-1"),
        }
    }

    fn total_tokens(messages: &[Message]) -> usize {
        messages.iter().map(estimate_tokens).sum()
    }

    #[rstest]
    #[case(10)]
    #[case(50)]
    #[case(100)]
    #[case(1000)]
    fn test_never_exceeds_budget(#[case] budget: usize) {
        let mut messages = vec![msg(MessageRole::System, 40)];
        for _ in 0..20 {
            messages.push(msg(MessageRole::User, 60));
            messages.push(msg(MessageRole::Assistant, 80));
        }

        let trimmed = trim_messages(&messages, budget);
        assert!(
            total_tokens(&trimmed) <= budget,
            "window of {} tokens exceeds budget {}",
            total_tokens(&trimmed),
            budget
        );
    }

    #[test]
    fn test_keeps_system_and_recent_turns() {
        let messages = vec![
            msg(MessageRole::System, 40),
            msg(MessageRole::User, 400),
            msg(MessageRole::Assistant, 400),
            msg(MessageRole::User, 40),
            msg(MessageRole::Assistant, 40),
        ];

        // Budget fits system + the last user/assistant pair only
        let trimmed = trim_messages(&messages, 40);

        assert_eq!(trimmed.len(), 3);
        assert_eq!(trimmed[0].role, MessageRole::System);
        assert_eq!(trimmed[1].role, MessageRole::User);
        assert_eq!(trimmed[1].content.len(), 40);
        assert_eq!(trimmed[2].role, MessageRole::Assistant);
    }

    #[test]
    fn test_window_starts_on_user_turn() {
        let messages = vec![
            msg(MessageRole::User, 200),
            msg(MessageRole::Assistant, 40),
            msg(MessageRole::User, 40),
            msg(MessageRole::Assistant, 40),
        ];

        // The budget cuts inside the first exchange; the leading assistant
        // leftover must be dropped so the window opens on a user message.
        let trimmed = trim_messages(&messages, 35);

        assert_eq!(trimmed[0].role, MessageRole::User);
        assert_eq!(trimmed.len(), 2);
    }

    #[test]
    fn test_messages_are_never_split() {
        let messages = vec![msg(MessageRole::User, 400), msg(MessageRole::User, 400)];

        let trimmed = trim_messages(&messages, 150);

        // 400 chars = 100 tokens each; both fit only partially under 150,
        // so exactly one whole message survives
        assert_eq!(trimmed.len(), 1);
        assert_eq!(trimmed[0].content.len(), 400);
    }

    #[test]
    fn test_everything_fits_unchanged() {
        let messages = vec![
            msg(MessageRole::System, 20),
            msg(MessageRole::User, 20),
            msg(MessageRole::Assistant, 20),
        ];

        let trimmed = trim_messages(&messages, 1000);
        assert_eq!(trimmed.len(), 3);
    }

    #[test]
    fn test_memory_preserves_order_per_thread() {
        let memory = ConversationMemory::new();
        memory.append("42", &[Message::user("first"), Message::assistant("reply")]);
        memory.append("42", &[Message::user("second")]);
        memory.append("7", &[Message::user("other user")]);

        let history = memory.history("42");
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].content, "first");
        assert_eq!(history[1].content, "reply");
        assert_eq!(history[2].content, "second");

        assert_eq!(memory.history("7").len(), 1);
        assert!(memory.history("unknown").is_empty());
    }

    #[test]
    fn test_memory_clear_targets_one_thread() {
        let memory = ConversationMemory::new();
        memory.append("a", &[Message::user("hi")]);
        memory.append("b", &[Message::user("hi")]);

        memory.clear("a");

        assert!(memory.history("a").is_empty());
        assert_eq!(memory.history("b").len(), 1);
    }
}
