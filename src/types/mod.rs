use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============= API Request/Response Types =============

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatRequest {
    pub user_id: String,
    pub user_name: String,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: String,
}

// ============= Conversation Types =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    /// Tool invocations requested by an assistant turn.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    /// Set on tool turns: the id of the call this message answers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(MessageRole::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolCall>,
    ) -> Self {
        let mut message = Self::new(MessageRole::Assistant, content);
        message.tool_calls = tool_calls;
        message
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        let mut message = Self::new(MessageRole::Tool, content);
        message.tool_call_id = Some(tool_call_id.into());
        message
    }

    fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: Vec::new(),
            tool_call_id: None,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

// ============= Tool Types =============

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

// ============= Finance Types =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub user: String,
    pub name: String,
    /// Upper-cased `name`, kept in sync at write time for fuzzy matching.
    pub normalized_name: String,
    pub is_income: bool,
    /// Optional budget ceiling for the category.
    pub limit_amount: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    pub user: String,
    pub category_id: i64,
    pub category_name: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub description: Option<String>,
}

// ============= Agent Settings Types =============

/// A named agent configuration: which model to talk to and the system-prompt
/// template to render for each turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSettings {
    pub id: i64,
    pub model: String,
    pub prompt: String,
    pub is_default: bool,
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Required invocation fields missing or blank. Never retried.
    #[error("Validation error: {0}")]
    Validation(String),

    /// No applicable agent settings exist for a user. Operator-actionable:
    /// seed a default configuration (`buffet-server init`).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A configured capability identifier could not be resolved. Fatal at
    /// registry-load time; the previous tool set stays active.
    #[error("Tool loading error: {0}")]
    ToolLoading(String),

    /// Model or agent construction failed (bad model name, provider down).
    #[error("Agent creation error: {0}")]
    AgentCreation(String),

    /// A system-prompt template referenced a placeholder with no value.
    #[error("Prompt format error: {0}")]
    PromptFormat(String),

    /// Catch-all for unexpected failures while dispatching to the model.
    #[error("Agent error: {0}")]
    Agent(String),

    #[error("LLM error: {0}")]
    LLM(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    /// Wrap a failure that escaped the agent dispatch boundary.
    ///
    /// Errors already in the taxonomy pass through unchanged so their kind
    /// survives up to the transport; anything else (LLM transport failures,
    /// database errors inside tool calls) is folded once into
    /// [`AppError::Agent`] with the original message preserved.
    pub fn into_dispatch_error(self) -> Self {
        match self {
            AppError::Validation(_)
            | AppError::Configuration(_)
            | AppError::ToolLoading(_)
            | AppError::AgentCreation(_)
            | AppError::PromptFormat(_)
            | AppError::Agent(_) => self,
            AppError::LLM(msg) | AppError::Database(msg) => AppError::Agent(msg),
        }
    }

    /// Message a transport may show to the end user.
    ///
    /// Validation problems are actionable and shown as-is; everything
    /// downstream of the model boundary collapses to a generic apology so
    /// internals never leak into the chat.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Configuration(_) => {
                "The assistant is not configured yet. Please contact the administrator.".to_string()
            }
            AppError::AgentCreation(_) | AppError::ToolLoading(_) => {
                "The assistant is unavailable right now. Please try again later.".to_string()
            }
            AppError::PromptFormat(_)
            | AppError::Agent(_)
            | AppError::LLM(_)
            | AppError::Database(_) => {
                "Sorry, something went wrong while answering. Please try again.".to_string()
            }
        }
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match self {
            AppError::Validation(_) => axum::http::StatusCode::BAD_REQUEST,
            AppError::AgentCreation(_) => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            AppError::Configuration(_)
            | AppError::ToolLoading(_)
            | AppError::PromptFormat(_)
            | AppError::Agent(_)
            | AppError::LLM(_)
            | AppError::Database(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "error": self.user_message()
        });

        (status, axum::Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_wrapping_preserves_taxonomy_kinds() {
        let err = AppError::Configuration("no settings".into()).into_dispatch_error();
        assert!(matches!(err, AppError::Configuration(_)));

        let err = AppError::ToolLoading("bad tool".into()).into_dispatch_error();
        assert!(matches!(err, AppError::ToolLoading(_)));

        // Already-wrapped agent errors are not wrapped twice
        let err = AppError::Agent("boom".into()).into_dispatch_error();
        match err {
            AppError::Agent(msg) => assert_eq!(msg, "boom"),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_dispatch_wrapping_folds_llm_errors() {
        let err = AppError::LLM("connection refused".into()).into_dispatch_error();
        match err {
            AppError::Agent(msg) => assert!(msg.contains("connection refused")),
            other => panic!("unexpected: {other}"),
        }
    }

    #[test]
    fn test_user_message_does_not_leak_internals() {
        let err = AppError::Agent("stack trace: secret internal detail".into());
        assert!(!err.user_message().contains("secret"));

        let err = AppError::Validation("user_id must not be blank".into());
        assert!(err.user_message().contains("user_id"));
    }
}
