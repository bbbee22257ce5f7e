use async_trait::async_trait;

use crate::types::{AppError, Result, ToolCall, ToolDefinition};
use crate::types::Message;
use crate::utils::config::ProviderConfig;

/// Generic LLM client trait for provider abstraction
///
/// One call is one model round-trip over the full conversation window; the
/// caller owns history assembly, trimming, and the tool-execution loop.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Send the conversation and the tool definitions the model may call.
    async fn chat(&self, messages: &[Message], tools: &[ToolDefinition]) -> Result<LLMResponse>;

    /// Get the model name/identifier
    fn model_name(&self) -> &str;
}

/// Response from an LLM chat request
#[derive(Debug, Clone)]
pub struct LLMResponse {
    /// The text content of the response
    pub content: String,
    /// Any tool calls requested by the model
    pub tool_calls: Vec<ToolCall>,
    /// The reason generation stopped (e.g., "stop", "tool_calls", "length")
    pub finish_reason: String,
}

/// Provider enum for runtime selection
#[derive(Debug, Clone)]
pub enum Provider {
    /// OpenAI API provider (including compatible APIs)
    OpenAI {
        api_key: String,
        api_base: String,
        model: String,
    },

    /// Ollama local LLM provider
    Ollama { base_url: String, model: String },
}

impl Provider {
    /// Create a client instance for this provider
    pub async fn create_client(&self) -> Result<Box<dyn LLMClient>> {
        match self {
            Provider::OpenAI {
                api_key,
                api_base,
                model,
            } => Ok(Box::new(super::openai::OpenAIClient::new(
                api_key.clone(),
                api_base.clone(),
                model.clone(),
            ))),

            Provider::Ollama { base_url, model } => Ok(Box::new(
                super::ollama::OllamaClient::new(base_url.clone(), model.clone())?,
            )),
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Ollama { .. } => "Ollama",
        }
    }
}

/// Factory seam for creating clients bound to a model name.
///
/// The production impl reads provider credentials from configuration; tests
/// substitute scripted clients.
#[async_trait]
pub trait LLMClientFactory: Send + Sync {
    async fn create(&self, model: &str) -> Result<Box<dyn LLMClient>>;
}

/// Configuration-based client factory
pub struct ProviderClientFactory {
    config: ProviderConfig,
}

impl ProviderClientFactory {
    pub fn new(config: ProviderConfig) -> Self {
        Self { config }
    }

    fn provider_for_model(&self, model: &str) -> Result<Provider> {
        match &self.config {
            ProviderConfig::OpenAI {
                api_key_env,
                api_base,
            } => {
                let api_key = std::env::var(api_key_env).map_err(|_| {
                    AppError::Configuration(format!(
                        "Environment variable '{}' is not set",
                        api_key_env
                    ))
                })?;

                Ok(Provider::OpenAI {
                    api_key,
                    api_base: api_base.clone(),
                    model: model.to_string(),
                })
            }
            ProviderConfig::Ollama { base_url } => Ok(Provider::Ollama {
                base_url: base_url.clone(),
                model: model.to_string(),
            }),
        }
    }
}

#[async_trait]
impl LLMClientFactory for ProviderClientFactory {
    async fn create(&self, model: &str) -> Result<Box<dyn LLMClient>> {
        self.provider_for_model(model)?.create_client().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_name() {
        let openai = Provider::OpenAI {
            api_key: "".to_string(),
            api_base: "".to_string(),
            model: "".to_string(),
        };
        assert_eq!(openai.name(), "OpenAI");

        let ollama = Provider::Ollama {
            base_url: "".to_string(),
            model: "".to_string(),
        };
        assert_eq!(ollama.name(), "Ollama");
    }

    #[tokio::test]
    async fn test_missing_api_key_env_is_a_configuration_error() {
        let factory = ProviderClientFactory::new(ProviderConfig::OpenAI {
            api_key_env: "BUFFET_TEST_KEY_THAT_DOES_NOT_EXIST".to_string(),
            api_base: "https://api.openai.com/v1".to_string(),
        });

        let err = factory.create("gpt-4o-mini").await.err().unwrap();
        match err {
            AppError::Configuration(msg) => {
                assert!(msg.contains("BUFFET_TEST_KEY_THAT_DOES_NOT_EXIST"));
            }
            other => panic!("unexpected: {other}"),
        }
    }
}
