//! HTTP surface tests with a scripted model client behind the real router.

use async_trait::async_trait;
use axum_test::TestServer;
use buffet::agents::{AgentFactory, AgentInvoker};
use buffet::db::BuffetDb;
use buffet::llm::{LLMClient, LLMClientFactory, LLMResponse};
use buffet::memory::ConversationMemory;
use buffet::settings::{CachePolicy, InMemorySettingsStore, SettingsResolver, SettingsStore};
use buffet::tools::registry::CAPABILITY_NAMES;
use buffet::tools::SharedToolRegistry;
use buffet::types::{AppError, ChatResponse, Message, Result, ToolDefinition};
use buffet::utils::config::BuffetConfig;
use buffet::AppState;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

struct MockLLMClient {
    script: Arc<Mutex<VecDeque<LLMResponse>>>,
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn chat(&self, _messages: &[Message], _tools: &[ToolDefinition]) -> Result<LLMResponse> {
        self.script
            .lock()
            .pop_front()
            .ok_or_else(|| AppError::LLM("mock script exhausted".to_string()))
    }

    fn model_name(&self) -> &str {
        "test-model"
    }
}

#[derive(Default)]
struct MockFactory {
    script: Arc<Mutex<VecDeque<LLMResponse>>>,
}

#[async_trait]
impl LLMClientFactory for MockFactory {
    async fn create(&self, _model: &str) -> Result<Box<dyn LLMClient>> {
        Ok(Box::new(MockLLMClient {
            script: self.script.clone(),
        }))
    }
}

async fn test_server(responses: Vec<LLMResponse>) -> (TestServer, TempDir) {
    let dir = TempDir::new().expect("create temp dir");
    let db = Arc::new(
        BuffetDb::new(&dir.path().join("test.db").to_string_lossy())
            .await
            .expect("create test db"),
    );

    let store = Arc::new(InMemorySettingsStore::new());
    store
        .insert("You assist {user_name}.", "test-model", true)
        .unwrap();
    let resolver = Arc::new(SettingsResolver::new(
        store as Arc<dyn SettingsStore>,
        CachePolicy::None,
    ));

    let tools = Arc::new(SharedToolRegistry::new(db.clone()));
    let names: Vec<String> = CAPABILITY_NAMES.iter().map(|s| s.to_string()).collect();
    tools.load(&names).unwrap();

    let factory = MockFactory::default();
    factory.script.lock().extend(responses);

    let agent_factory = Arc::new(AgentFactory::new(
        Arc::new(factory),
        tools,
        Some(Arc::new(ConversationMemory::new())),
        48_000,
        5,
    ));

    let invoker = Arc::new(AgentInvoker::new(
        resolver,
        agent_factory,
        Duration::from_secs(5),
    ));

    let state = AppState {
        config: Arc::new(BuffetConfig::default()),
        db,
        invoker,
    };

    let app = buffet::api::create_router().with_state(state);
    (TestServer::new(app).expect("start test server"), dir)
}

fn text(content: &str) -> LLMResponse {
    LLMResponse {
        content: content.to_string(),
        tool_calls: vec![],
        finish_reason: "stop".to_string(),
    }
}

#[tokio::test]
async fn test_chat_endpoint_returns_reply() {
    let (server, _dir) = test_server(vec![text("Hello from Mr Buffet")]).await;

    let response = server
        .post("/api/chat")
        .json(&json!({
            "user_id": "42",
            "user_name": "Alice",
            "message": "hello"
        }))
        .await;

    response.assert_status_ok();
    let body: ChatResponse = response.json();
    assert_eq!(body.message, "Hello from Mr Buffet");
}

#[tokio::test]
async fn test_chat_rejects_blank_fields_with_400() {
    let (server, _dir) = test_server(vec![]).await;

    let response = server
        .post("/api/chat")
        .json(&json!({
            "user_id": "",
            "user_name": "Alice",
            "message": "hello"
        }))
        .await;

    response.assert_status_bad_request();
    let body: serde_json::Value = response.json();
    let error = body["error"].as_str().unwrap();
    assert!(error.contains("user_id"));
}

#[tokio::test]
async fn test_chat_failure_returns_500_with_generic_message() {
    // Empty script: the model call fails
    let (server, _dir) = test_server(vec![]).await;

    let response = server
        .post("/api/chat")
        .json(&json!({
            "user_id": "42",
            "user_name": "Alice",
            "message": "hello"
        }))
        .await;

    response.assert_status_internal_server_error();
    let body: serde_json::Value = response.json();
    let error = body["error"].as_str().unwrap();
    // No internal detail leaks to the client
    assert!(!error.contains("mock script exhausted"));
}

#[tokio::test]
async fn test_health_endpoint() {
    let (server, _dir) = test_server(vec![]).await;

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.text(), "OK");
}
