use crate::agents::finance::FinanceAgent;
use crate::llm::LLMClientFactory;
use crate::memory::ConversationMemory;
use crate::tools::SharedToolRegistry;
use crate::types::{AppError, Result};
use std::sync::Arc;

/// Builds [`FinanceAgent`]s from resolved settings.
///
/// Agents are cheap: each one is a model client plus a snapshot of the
/// current tool registry, so a tool reload between turns takes effect on the
/// next agent without tearing down anything in flight.
pub struct AgentFactory {
    llm_factory: Arc<dyn LLMClientFactory>,
    tools: Arc<SharedToolRegistry>,
    memory: Option<Arc<ConversationMemory>>,
    max_history_tokens: usize,
    max_tool_iterations: usize,
}

impl AgentFactory {
    pub fn new(
        llm_factory: Arc<dyn LLMClientFactory>,
        tools: Arc<SharedToolRegistry>,
        memory: Option<Arc<ConversationMemory>>,
        max_history_tokens: usize,
        max_tool_iterations: usize,
    ) -> Self {
        Self {
            llm_factory,
            tools,
            memory,
            max_history_tokens,
            max_tool_iterations,
        }
    }

    pub async fn create(&self, model: &str) -> Result<FinanceAgent> {
        let client = self.llm_factory.create(model).await.map_err(|e| {
            AppError::AgentCreation(format!("Failed to create agent for model '{}': {}", model, e))
        })?;

        Ok(FinanceAgent::new(
            client,
            self.tools.snapshot(),
            self.memory.clone(),
            self.max_history_tokens,
            self.max_tool_iterations,
        ))
    }
}
