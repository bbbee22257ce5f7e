use crate::agents::factory::AgentFactory;
use crate::agents::prompt::format_prompt;
use crate::settings::SettingsResolver;
use crate::types::{AppError, MessageRole, Result};
use std::sync::Arc;
use std::time::Duration;

const REFRESH_COMMAND: &str = "/refresh";
const REFRESH_REPLY: &str =
    "Settings cache cleared. Your next message will use the latest configuration.";

/// Entry point for a chat turn, shared by every transport.
///
/// Validates the request, resolves the caller's agent settings, builds an
/// agent, and dispatches the message under a timeout. The special message
/// `/refresh` drops the caller's cached settings instead of reaching the
/// model.
pub struct AgentInvoker {
    resolver: Arc<SettingsResolver>,
    factory: Arc<AgentFactory>,
    llm_timeout: Duration,
}

impl AgentInvoker {
    pub fn new(
        resolver: Arc<SettingsResolver>,
        factory: Arc<AgentFactory>,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            factory,
            llm_timeout,
        }
    }

    pub async fn invoke(&self, user_id: &str, user_name: &str, message: &str) -> Result<String> {
        let mut missing = Vec::new();
        if user_id.trim().is_empty() {
            missing.push("user_id");
        }
        if user_name.trim().is_empty() {
            missing.push("user_name");
        }
        if message.trim().is_empty() {
            missing.push("message");
        }
        if !missing.is_empty() {
            return Err(AppError::Validation(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        if message.trim() == REFRESH_COMMAND {
            self.resolver.invalidate(user_id);
            tracing::info!(user_id, "settings cache invalidated on request");
            return Ok(REFRESH_REPLY.to_string());
        }

        let settings = self.resolver.resolve(user_id).await?;
        let system_prompt = format_prompt(&settings.prompt, user_id, user_name)?;
        let agent = self.factory.create(&settings.model).await?;

        tracing::info!(user_id, model = %settings.model, "dispatching message to agent");

        let turn = tokio::time::timeout(
            self.llm_timeout,
            agent.respond(&system_prompt, message, user_id),
        )
        .await
        .map_err(|_| AppError::Agent("The model did not respond in time".to_string()))?
        .map_err(AppError::into_dispatch_error)?;

        turn.iter()
            .rev()
            .find(|m| m.role == MessageRole::Assistant && !m.content.is_empty())
            .map(|m| m.content.clone())
            .ok_or_else(|| AppError::Agent("The agent produced no reply".to_string()))
    }
}
