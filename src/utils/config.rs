//! TOML-based configuration for Mr Buffet
//!
//! Declarative configuration for the server, the database, the LLM provider,
//! and the agent's knobs via a TOML file (`buffet.toml`). Every field has a
//! sensible default so a minimal file is enough to get started.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::types::{AppError, Result};

/// Root configuration structure loaded from buffet.toml
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BuffetConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub llm: ProviderConfig,

    #[serde(default)]
    pub agent: AgentConfig,
}

impl BuffetConfig {
    /// Load and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|e| {
            AppError::Configuration(format!("Failed to read {}: {}", path.display(), e))
        })?;

        toml::from_str(&raw).map_err(|e| {
            AppError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
        })
    }
}

// ============= Server Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

// ============= Database Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local database path
    #[serde(default = "default_database_url")]
    pub url: String,
}

fn default_database_url() -> String {
    "./data/buffet.db".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

// ============= Provider Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ProviderConfig {
    OpenAI {
        /// Environment variable containing the API key
        #[serde(default = "default_openai_key_env")]
        api_key_env: String,
        #[serde(default = "default_openai_base")]
        api_base: String,
    },
    Ollama {
        #[serde(default = "default_ollama_url")]
        base_url: String,
    },
}

fn default_openai_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_openai_base() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::OpenAI {
            api_key_env: default_openai_key_env(),
            api_base: default_openai_base(),
        }
    }
}

// ============= Agent Configuration =============

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Capability identifiers to load into the tool registry.
    #[serde(default = "default_tools")]
    pub tools: Vec<String>,

    /// Keep per-user conversation history across invocations.
    #[serde(default = "default_use_memory")]
    pub use_memory: bool,

    /// Token budget for the history window sent to the model.
    #[serde(default = "default_max_history_tokens")]
    pub max_history_tokens: usize,

    /// Upper bound on tool-call rounds in a single turn.
    #[serde(default = "default_max_tool_iterations")]
    pub max_tool_iterations: usize,

    /// Timeout for one full model round-trip, in seconds.
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,

    /// TTL for cached per-user settings lookups, in seconds.
    /// Absent means lookups always hit the store.
    #[serde(default)]
    pub settings_cache_ttl_secs: Option<u64>,
}

fn default_tools() -> Vec<String> {
    vec![
        "create_category".to_string(),
        "create_transaction".to_string(),
        "search_category".to_string(),
        "search_user_categories".to_string(),
        "search_transactions".to_string(),
        "update_transaction".to_string(),
        "delete_transaction".to_string(),
        "update_category".to_string(),
        "delete_category".to_string(),
    ]
}

fn default_use_memory() -> bool {
    true
}

fn default_max_history_tokens() -> usize {
    48_000
}

fn default_max_tool_iterations() -> usize {
    5
}

fn default_llm_timeout_secs() -> u64 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            tools: default_tools(),
            use_memory: default_use_memory(),
            max_history_tokens: default_max_history_tokens(),
            max_tool_iterations: default_max_tool_iterations(),
            llm_timeout_secs: default_llm_timeout_secs(),
            settings_cache_ttl_secs: None,
        }
    }
}

impl AgentConfig {
    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: BuffetConfig = toml::from_str("").unwrap();
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.agent.max_history_tokens, 48_000);
        assert_eq!(config.agent.tools.len(), 9);
        assert!(config.agent.settings_cache_ttl_secs.is_none());
        assert!(matches!(config.llm, ProviderConfig::OpenAI { .. }));
    }

    #[test]
    fn test_parse_ollama_provider() {
        let raw = r#"
            [llm]
            type = "ollama"
            base_url = "http://10.0.0.2:11434"
        "#;
        let config: BuffetConfig = toml::from_str(raw).unwrap();
        match config.llm {
            ProviderConfig::Ollama { base_url } => {
                assert_eq!(base_url, "http://10.0.0.2:11434");
            }
            other => panic!("expected ollama provider, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_agent_overrides() {
        let raw = r#"
            [agent]
            tools = ["create_category", "search_user_categories"]
            use_memory = false
            max_history_tokens = 1000
            settings_cache_ttl_secs = 1800
        "#;
        let config: BuffetConfig = toml::from_str(raw).unwrap();
        assert_eq!(config.agent.tools.len(), 2);
        assert!(!config.agent.use_memory);
        assert_eq!(config.agent.max_history_tokens, 1000);
        assert_eq!(config.agent.settings_cache_ttl_secs, Some(1800));
    }
}
