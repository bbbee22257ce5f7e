//! Init command implementation
//!
//! Scaffolds a new project: writes buffet.toml, creates the data directory,
//! and seeds the database with a default agent settings row.

use super::output::Output;
use crate::db::BuffetDb;
use crate::types::Result;
use std::fs;
use std::path::PathBuf;

/// Result of the init operation
pub enum InitResult {
    Success,
    /// Project already exists (buffet.toml found)
    AlreadyExists,
    Error(String),
}

pub struct InitConfig {
    /// Directory to initialize
    pub path: PathBuf,
    /// Overwrite existing files
    pub force: bool,
    /// LLM provider to configure (ollama or openai)
    pub provider: String,
}

/// System prompt seeded into the default agent settings row.
pub const DEFAULT_PROMPT: &str = "You are Mr Buffet, a personal finance assistant. You help {user_name} \
(user id {user_id}) track spending categories and transactions using your tools. \
The current date and time is {now}. Always pass the user's id to every tool call. \
Be concise and confirm every change you make.";

/// Default model for a provider choice.
pub fn default_model(provider: &str) -> &'static str {
    match provider {
        "openai" => "gpt-4o-mini",
        _ => "llama3.2",
    }
}

fn config_template(provider: &str) -> String {
    let llm_section = match provider {
        "openai" => {
            r#"[llm]
type = "openai"
api_key_env = "OPENAI_API_KEY"
api_base = "https://api.openai.com/v1"
"#
        }
        _ => {
            r#"[llm]
type = "ollama"
base_url = "http://localhost:11434"
"#
        }
    };

    format!(
        r#"# Mr Buffet server configuration

[server]
host = "127.0.0.1"
port = 3000
log_level = "info"

[database]
url = "./data/buffet.db"

{llm_section}
[agent]
# Capabilities loaded into the tool registry at startup.
tools = [
    "create_category",
    "create_transaction",
    "search_category",
    "search_user_categories",
    "search_transactions",
    "update_transaction",
    "delete_transaction",
    "update_category",
    "delete_category",
]
use_memory = true
max_history_tokens = 48000
max_tool_iterations = 5
llm_timeout_secs = 120
# settings_cache_ttl_secs = 300
"#
    )
}

/// Write buffet.toml and the data directory.
pub fn run(config: InitConfig, output: &Output) -> InitResult {
    output.banner();
    output.header("Initializing project");

    let config_path = config.path.join("buffet.toml");
    if config_path.exists() && !config.force {
        output.warning("buffet.toml already exists!");
        output.hint("Use --force to overwrite existing files");
        return InitResult::AlreadyExists;
    }

    let data_dir = config.path.join("data");
    if !data_dir.exists() {
        if let Err(e) = fs::create_dir_all(&data_dir) {
            output.error(&format!("Failed to create data/: {}", e));
            return InitResult::Error(e.to_string());
        }
        output.success("Created data/");
    }

    if let Err(e) = fs::write(&config_path, config_template(&config.provider)) {
        output.error(&format!("Failed to write buffet.toml: {}", e));
        return InitResult::Error(e.to_string());
    }
    output.success("Created buffet.toml");

    InitResult::Success
}

/// Insert a default agent settings row unless one already exists.
pub async fn seed_defaults(db: &BuffetDb, provider: &str, output: &Output) -> Result<()> {
    if db.default_settings().await?.is_some() {
        output.info("Default agent settings already present, skipping seed");
        return Ok(());
    }

    let model = default_model(provider);
    db.insert_agent_settings(DEFAULT_PROMPT, model, true).await?;
    output.success(&format!("Seeded default agent settings (model: {})", model));
    Ok(())
}
