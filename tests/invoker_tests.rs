//! End-to-end invoker tests with a scripted model client.
//!
//! No network: the model is a mock that replays a scripted sequence of
//! responses and records every message window it was sent. Tools run
//! against a real temporary database.

use async_trait::async_trait;
use buffet::agents::{AgentFactory, AgentInvoker};
use buffet::db::BuffetDb;
use buffet::llm::{LLMClient, LLMClientFactory, LLMResponse};
use buffet::memory::ConversationMemory;
use buffet::settings::{
    CachePolicy, InMemorySettingsStore, SettingsResolver, SettingsStore,
};
use buffet::tools::registry::CAPABILITY_NAMES;
use buffet::tools::SharedToolRegistry;
use buffet::types::{
    AgentSettings, AppError, Message, MessageRole, Result, ToolCall, ToolDefinition,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn text(content: &str) -> LLMResponse {
    LLMResponse {
        content: content.to_string(),
        tool_calls: vec![],
        finish_reason: "stop".to_string(),
    }
}

fn tool_call(name: &str, arguments: serde_json::Value) -> LLMResponse {
    LLMResponse {
        content: String::new(),
        tool_calls: vec![ToolCall {
            id: format!("call-{}", name),
            name: name.to_string(),
            arguments,
        }],
        finish_reason: "tool_calls".to_string(),
    }
}

struct MockLLMClient {
    script: Arc<Mutex<VecDeque<LLMResponse>>>,
    seen: Arc<Mutex<Vec<Vec<Message>>>>,
    model: String,
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn chat(&self, messages: &[Message], _tools: &[ToolDefinition]) -> Result<LLMResponse> {
        self.seen.lock().push(messages.to_vec());
        self.script
            .lock()
            .pop_front()
            .ok_or_else(|| AppError::LLM("mock script exhausted".to_string()))
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Default)]
struct MockFactory {
    script: Arc<Mutex<VecDeque<LLMResponse>>>,
    seen: Arc<Mutex<Vec<Vec<Message>>>>,
    models: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl LLMClientFactory for MockFactory {
    async fn create(&self, model: &str) -> Result<Box<dyn LLMClient>> {
        self.models.lock().push(model.to_string());
        Ok(Box::new(MockLLMClient {
            script: self.script.clone(),
            seen: self.seen.clone(),
            model: model.to_string(),
        }))
    }
}

/// Settings store wrapper that counts lookups.
struct CountingStore {
    inner: Arc<InMemorySettingsStore>,
    lookups: AtomicUsize,
}

#[async_trait]
impl SettingsStore for CountingStore {
    async fn settings_for_user(&self, user_id: &str) -> Result<Option<AgentSettings>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.settings_for_user(user_id).await
    }

    async fn default_settings(&self) -> Result<Option<AgentSettings>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        self.inner.default_settings().await
    }
}

const PROMPT: &str = "You assist {user_name} (id {user_id}).";

struct Harness {
    invoker: AgentInvoker,
    store: Arc<InMemorySettingsStore>,
    counting: Arc<CountingStore>,
    db: Arc<BuffetDb>,
    script: Arc<Mutex<VecDeque<LLMResponse>>>,
    seen: Arc<Mutex<Vec<Vec<Message>>>>,
    models: Arc<Mutex<Vec<String>>>,
    _dir: TempDir,
}

impl Harness {
    fn push_script(&self, responses: Vec<LLMResponse>) {
        self.script.lock().extend(responses);
    }

    fn windows(&self) -> Vec<Vec<Message>> {
        self.seen.lock().clone()
    }
}

async fn harness(policy: CachePolicy, prompt: &str, max_tool_iterations: usize) -> Harness {
    let dir = TempDir::new().expect("create temp dir");
    let db = Arc::new(
        BuffetDb::new(&dir.path().join("test.db").to_string_lossy())
            .await
            .expect("create test db"),
    );

    let store = Arc::new(InMemorySettingsStore::new());
    store.insert(prompt, "test-model", true).unwrap();
    let counting = Arc::new(CountingStore {
        inner: store.clone(),
        lookups: AtomicUsize::new(0),
    });

    let resolver = Arc::new(SettingsResolver::new(
        counting.clone() as Arc<dyn SettingsStore>,
        policy,
    ));

    let tools = Arc::new(SharedToolRegistry::new(db.clone()));
    let names: Vec<String> = CAPABILITY_NAMES.iter().map(|s| s.to_string()).collect();
    tools.load(&names).unwrap();

    let factory = MockFactory::default();
    let script = factory.script.clone();
    let seen = factory.seen.clone();
    let models = factory.models.clone();

    let agent_factory = Arc::new(AgentFactory::new(
        Arc::new(factory),
        tools,
        Some(Arc::new(ConversationMemory::new())),
        48_000,
        max_tool_iterations,
    ));

    let invoker = AgentInvoker::new(resolver, agent_factory, Duration::from_secs(5));

    Harness {
        invoker,
        store,
        counting,
        db,
        script,
        seen,
        models,
        _dir: dir,
    }
}

#[tokio::test]
async fn test_blank_fields_fail_before_any_lookup() {
    let h = harness(CachePolicy::None, PROMPT, 5).await;

    let err = h.invoker.invoke("", "Alice", "hello").await.unwrap_err();
    match &err {
        AppError::Validation(msg) => assert!(msg.contains("user_id")),
        other => panic!("expected validation error, got {:?}", other),
    }

    let err = h.invoker.invoke("  ", "", " ").await.unwrap_err();
    match &err {
        AppError::Validation(msg) => {
            assert!(msg.contains("user_id"));
            assert!(msg.contains("user_name"));
            assert!(msg.contains("message"));
        }
        other => panic!("expected validation error, got {:?}", other),
    }

    assert_eq!(h.counting.lookups.load(Ordering::SeqCst), 0);
    assert!(h.windows().is_empty());
}

#[tokio::test]
async fn test_plain_reply_round_trip() {
    let h = harness(CachePolicy::None, PROMPT, 5).await;
    h.push_script(vec![text("Hello Alice, how can I help?")]);

    let reply = h.invoker.invoke("42", "Alice", "hi there").await.unwrap();
    assert_eq!(reply, "Hello Alice, how can I help?");

    // The system message carries the rendered prompt
    let windows = h.windows();
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0][0].role, MessageRole::System);
    assert_eq!(windows[0][0].content, "You assist Alice (id 42).");
    assert_eq!(windows[0].last().unwrap().content, "hi there");
}

#[tokio::test]
async fn test_tool_call_executes_and_feeds_back() {
    let h = harness(CachePolicy::None, PROMPT, 5).await;
    h.push_script(vec![
        tool_call(
            "create_category",
            json!({"user": "42", "category_name": "Food"}),
        ),
        text("Created your Food category."),
    ]);

    let reply = h
        .invoker
        .invoke("42", "Alice", "make a food category")
        .await
        .unwrap();
    assert_eq!(reply, "Created your Food category.");

    // The tool really ran
    let stored = h.db.find_category_by_name("42", "food").await.unwrap();
    assert!(stored.is_some());

    // The second model call saw the tool result
    let windows = h.windows();
    assert_eq!(windows.len(), 2);
    let tool_msg = windows[1]
        .iter()
        .find(|m| m.role == MessageRole::Tool)
        .expect("tool result in second window");
    assert!(tool_msg.content.starts_with("Category ID: "));
    assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call-create_category"));
}

#[tokio::test]
async fn test_bad_tool_arguments_are_relayed_not_fatal() {
    let h = harness(CachePolicy::None, PROMPT, 5).await;
    h.push_script(vec![
        tool_call("create_transaction", json!({"user": "42"})),
        text("I need a category and amount first."),
    ]);

    let reply = h
        .invoker
        .invoke("42", "Alice", "log a transaction")
        .await
        .unwrap();
    assert_eq!(reply, "I need a category and amount first.");

    let windows = h.windows();
    let tool_msg = windows[1]
        .iter()
        .find(|m| m.role == MessageRole::Tool)
        .expect("tool result in second window");
    assert!(tool_msg.content.contains("Invalid arguments"));
}

#[tokio::test]
async fn test_memory_carries_earlier_turns() {
    let h = harness(CachePolicy::None, PROMPT, 5).await;

    h.push_script(vec![text("Noted: you like ETFs.")]);
    h.invoker.invoke("42", "Alice", "I like ETFs").await.unwrap();

    h.push_script(vec![text("You told me you like ETFs.")]);
    h.invoker
        .invoke("42", "Alice", "what do I like?")
        .await
        .unwrap();

    let windows = h.windows();
    assert_eq!(windows.len(), 2);

    // Second window: system, first turn (user+assistant), new user message
    let contents: Vec<&str> = windows[1].iter().map(|m| m.content.as_str()).collect();
    assert_eq!(
        contents,
        vec![
            "You assist Alice (id 42).",
            "I like ETFs",
            "Noted: you like ETFs.",
            "what do I like?",
        ]
    );
}

#[tokio::test]
async fn test_memory_is_scoped_per_user() {
    let h = harness(CachePolicy::None, PROMPT, 5).await;

    h.push_script(vec![text("ok")]);
    h.invoker.invoke("42", "Alice", "remember this").await.unwrap();

    h.push_script(vec![text("hi Bob")]);
    h.invoker.invoke("7", "Bob", "hello").await.unwrap();

    let windows = h.windows();
    // Bob's window has no trace of Alice's turn
    assert!(windows[1].iter().all(|m| m.content != "remember this"));
}

#[tokio::test]
async fn test_refresh_clears_cached_settings() {
    let h = harness(CachePolicy::Ttl(Duration::from_secs(300)), PROMPT, 5).await;

    h.push_script(vec![text("first")]);
    h.invoker.invoke("42", "Alice", "hello").await.unwrap();

    // Point the user at different settings; the cache still serves the old row
    let id = h.store.insert(PROMPT, "other-model", false).unwrap();
    h.store.assign_to_user("42", id);

    h.push_script(vec![text("second")]);
    h.invoker.invoke("42", "Alice", "hello again").await.unwrap();

    let reply = h.invoker.invoke("42", "Alice", "/refresh").await.unwrap();
    assert!(reply.contains("cache"));

    h.push_script(vec![text("third")]);
    h.invoker.invoke("42", "Alice", "hello once more").await.unwrap();

    let models = h.models.lock().clone();
    assert_eq!(models, vec!["test-model", "test-model", "other-model"]);
}

#[tokio::test]
async fn test_refresh_does_not_reach_the_model() {
    let h = harness(CachePolicy::None, PROMPT, 5).await;

    let reply = h.invoker.invoke("42", "Alice", " /refresh ").await.unwrap();
    assert!(reply.contains("latest configuration"));
    assert!(h.windows().is_empty());
}

#[tokio::test]
async fn test_user_override_beats_default_settings() {
    let h = harness(CachePolicy::None, PROMPT, 5).await;
    let id = h.store.insert(PROMPT, "override-model", false).unwrap();
    h.store.assign_to_user("42", id);

    h.push_script(vec![text("hi")]);
    h.invoker.invoke("42", "Alice", "hello").await.unwrap();

    h.push_script(vec![text("hi")]);
    h.invoker.invoke("7", "Bob", "hello").await.unwrap();

    let models = h.models.lock().clone();
    assert_eq!(models, vec!["override-model", "test-model"]);
}

#[tokio::test]
async fn test_no_settings_at_all_is_a_configuration_error() {
    let dir = TempDir::new().unwrap();
    let db = Arc::new(
        BuffetDb::new(&dir.path().join("test.db").to_string_lossy())
            .await
            .unwrap(),
    );

    let store = Arc::new(InMemorySettingsStore::new());
    let resolver = Arc::new(SettingsResolver::new(
        store as Arc<dyn SettingsStore>,
        CachePolicy::None,
    ));
    let tools = Arc::new(SharedToolRegistry::new(db));
    let factory = Arc::new(AgentFactory::new(
        Arc::new(MockFactory::default()),
        tools,
        None,
        48_000,
        5,
    ));
    let invoker = AgentInvoker::new(resolver, factory, Duration::from_secs(5));

    let err = invoker.invoke("42", "Alice", "hello").await.unwrap_err();
    assert!(matches!(err, AppError::Configuration(_)));
}

#[tokio::test]
async fn test_iteration_limit_produces_agent_error() {
    let h = harness(CachePolicy::None, PROMPT, 2).await;
    let call = || {
        tool_call(
            "search_user_categories",
            json!({"user": "42"}),
        )
    };
    h.push_script(vec![call(), call(), call()]);

    let err = h
        .invoker
        .invoke("42", "Alice", "loop forever")
        .await
        .unwrap_err();
    match &err {
        AppError::Agent(msg) => assert!(msg.contains("2")),
        other => panic!("expected agent error, got {:?}", other),
    }

    // Internal detail never reaches the user
    assert!(!err.user_message().contains("iterations"));
}

#[tokio::test]
async fn test_model_failure_is_wrapped_for_dispatch() {
    let h = harness(CachePolicy::None, PROMPT, 5).await;
    // Empty script: the mock client fails with an LLM error

    let err = h.invoker.invoke("42", "Alice", "hello").await.unwrap_err();
    assert!(matches!(err, AppError::Agent(_)));
}

#[tokio::test]
async fn test_broken_prompt_template_fails_before_model_call() {
    let h = harness(CachePolicy::None, "Hello {no_such_key}", 5).await;

    let err = h.invoker.invoke("42", "Alice", "hello").await.unwrap_err();
    assert!(matches!(err, AppError::PromptFormat(_)));
    assert!(h.windows().is_empty());
}
