//! Mr Buffet - personal finance assistant server
//!
//! An LLM-backed chat assistant that manages spending categories and
//! transactions through tool calls. The crate is organized around one
//! pipeline: a transport (HTTP or CLI) hands a chat turn to the
//! [`agents::AgentInvoker`], which resolves the caller's agent settings,
//! builds an agent over the active tool registry, and dispatches the
//! message to the configured model provider.
//!
//! # Module overview
//!
//! - [`types`] - shared data types and the error taxonomy
//! - [`utils`] - TOML configuration loading
//! - [`db`] - libsql-backed finance and settings store
//! - [`settings`] - per-user agent settings resolution and caching
//! - [`tools`] - the finance tool set and its registry
//! - [`llm`] - provider clients (OpenAI-compatible, Ollama)
//! - [`memory`] - conversation history and context trimming
//! - [`agents`] - prompt rendering, agent assembly, dispatch
//! - [`api`] - axum HTTP surface
//! - [`cli`] - clap command line

/// Agent assembly and dispatch.
pub mod agents;
/// HTTP transport.
pub mod api;
/// Command line interface.
pub mod cli;
/// Finance and settings persistence.
pub mod db;
/// LLM provider clients.
pub mod llm;
/// Conversation memory and trimming.
pub mod memory;
/// Agent settings resolution.
pub mod settings;
/// Finance tools.
pub mod tools;
/// Shared types and errors.
pub mod types;
/// Configuration loading.
pub mod utils;

use crate::agents::{AgentFactory, AgentInvoker};
use crate::db::BuffetDb;
use crate::llm::ProviderClientFactory;
use crate::memory::ConversationMemory;
use crate::settings::{CachePolicy, SettingsResolver, SettingsStore};
use crate::tools::SharedToolRegistry;
use crate::types::Result;
use crate::utils::config::BuffetConfig;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state for the HTTP server and CLI.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<BuffetConfig>,
    pub db: Arc<BuffetDb>,
    pub invoker: Arc<AgentInvoker>,
}

impl AppState {
    /// Wire the full pipeline from a loaded configuration.
    pub async fn from_config(config: BuffetConfig) -> Result<Self> {
        let config = Arc::new(config);

        let db = Arc::new(BuffetDb::new(&config.database.url).await?);

        let policy = match config.agent.settings_cache_ttl_secs {
            Some(secs) => CachePolicy::Ttl(Duration::from_secs(secs)),
            None => CachePolicy::None,
        };
        let resolver = Arc::new(SettingsResolver::new(
            db.clone() as Arc<dyn SettingsStore>,
            policy,
        ));

        let tools = Arc::new(SharedToolRegistry::new(db.clone()));
        tools.load(&config.agent.tools)?;
        tracing::info!(tools = config.agent.tools.len(), "tool registry loaded");

        let llm_factory = Arc::new(ProviderClientFactory::new(config.llm.clone()));

        let memory = config
            .agent
            .use_memory
            .then(|| Arc::new(ConversationMemory::new()));

        let factory = Arc::new(AgentFactory::new(
            llm_factory,
            tools,
            memory,
            config.agent.max_history_tokens,
            config.agent.max_tool_iterations,
        ));

        let invoker = Arc::new(AgentInvoker::new(
            resolver,
            factory,
            config.agent.llm_timeout(),
        ));

        Ok(Self {
            config,
            db,
            invoker,
        })
    }
}
