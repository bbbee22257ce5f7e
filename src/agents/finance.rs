use crate::llm::LLMClient;
use crate::memory::{trim_messages, ConversationMemory};
use crate::tools::ToolRegistry;
use crate::types::{AppError, Message, Result};
use std::sync::Arc;

/// A chat agent bound to one model, one tool set, and (optionally) one
/// conversation memory.
///
/// [`FinanceAgent::respond`] runs a complete turn: it assembles the trimmed
/// conversation, then alternates model calls and tool executions until the
/// model answers in plain text or the iteration limit is hit.
pub struct FinanceAgent {
    client: Box<dyn LLMClient>,
    tools: Arc<ToolRegistry>,
    memory: Option<Arc<ConversationMemory>>,
    max_history_tokens: usize,
    max_tool_iterations: usize,
}

impl FinanceAgent {
    pub fn new(
        client: Box<dyn LLMClient>,
        tools: Arc<ToolRegistry>,
        memory: Option<Arc<ConversationMemory>>,
        max_history_tokens: usize,
        max_tool_iterations: usize,
    ) -> Self {
        Self {
            client,
            tools,
            memory,
            max_history_tokens,
            max_tool_iterations,
        }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Run one turn and return the messages it produced, user message first,
    /// final assistant reply last. The turn is recorded in memory (when
    /// enabled) only after it completes.
    pub async fn respond(
        &self,
        system_prompt: &str,
        user_message: &str,
        thread_id: &str,
    ) -> Result<Vec<Message>> {
        let mut conversation = vec![Message::system(system_prompt)];
        if let Some(memory) = &self.memory {
            conversation.extend(memory.history(thread_id));
        }
        conversation.push(Message::user(user_message));
        let mut conversation = trim_messages(&conversation, self.max_history_tokens);

        let definitions = self.tools.get_tool_definitions();
        let mut turn = vec![Message::user(user_message)];

        for iteration in 0..self.max_tool_iterations {
            let response = self.client.chat(&conversation, &definitions).await?;

            if response.tool_calls.is_empty() {
                let reply = Message::assistant(response.content);
                turn.push(reply);
                if let Some(memory) = &self.memory {
                    memory.append(thread_id, &turn);
                }
                return Ok(turn);
            }

            tracing::debug!(
                iteration,
                calls = response.tool_calls.len(),
                "executing tool calls"
            );

            let assistant =
                Message::assistant_with_tool_calls(response.content, response.tool_calls.clone());
            conversation.push(assistant.clone());
            turn.push(assistant);

            for call in &response.tool_calls {
                let call_id = if call.id.is_empty() {
                    uuid::Uuid::new_v4().to_string()
                } else {
                    call.id.clone()
                };

                // Bad arguments are relayed to the model as tool output so
                // it can correct itself; everything else aborts the turn.
                let output = match self.tools.execute(&call.name, call.arguments.clone()).await {
                    Ok(text) => text,
                    Err(AppError::Validation(msg)) => msg,
                    Err(e) => return Err(e),
                };

                let message = Message::tool(output, call_id);
                conversation.push(message.clone());
                turn.push(message);
            }
        }

        Err(AppError::Agent(format!(
            "No final reply after {} tool iterations",
            self.max_tool_iterations
        )))
    }
}
