use crate::llm::client::{LLMClient, LLMResponse};
use crate::types::{AppError, Message, MessageRole, Result, ToolDefinition};
use async_trait::async_trait;
use ollama_rs::{
    generation::chat::{request::ChatMessageRequest, ChatMessage},
    Ollama,
};

pub struct OllamaClient {
    client: Ollama,
    model: String,
}

impl OllamaClient {
    pub fn new(base_url: String, model: String) -> Result<Self> {
        let url_parts: Vec<&str> = base_url.split("://").collect();
        let (host, port) = if url_parts.len() == 2 {
            let host_port: Vec<&str> = url_parts[1].split(':').collect();
            let host = host_port[0].to_string();
            let port = if host_port.len() == 2 {
                host_port[1].parse().unwrap_or(11434)
            } else {
                11434
            };
            (host, port)
        } else {
            ("localhost".to_string(), 11434)
        };

        let client = Ollama::new(host, port);

        Ok(Self { client, model })
    }
}

#[async_trait]
impl LLMClient for OllamaClient {
    async fn chat(&self, messages: &[Message], _tools: &[ToolDefinition]) -> Result<LLMResponse> {
        // Tool calling requires model support (e.g., llama3.1+, mistral-nemo)
        // and is not wired up; the history is sent as plain chat. Tool-result
        // turns are forwarded as system context so the model can still read
        // earlier results replayed from memory.
        let chat_messages: Vec<ChatMessage> = messages
            .iter()
            .map(|message| match message.role {
                MessageRole::System => ChatMessage::system(message.content.clone()),
                MessageRole::User => ChatMessage::user(message.content.clone()),
                MessageRole::Assistant => ChatMessage::assistant(message.content.clone()),
                MessageRole::Tool => ChatMessage::system(message.content.clone()),
            })
            .collect();

        let request = ChatMessageRequest::new(self.model.clone(), chat_messages);

        let response = self
            .client
            .send_chat_messages(request)
            .await
            .map_err(|e| AppError::LLM(format!("Ollama error: {}", e)))?;

        Ok(LLMResponse {
            content: response.message.content,
            tool_calls: vec![],
            finish_reason: "stop".to_string(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
