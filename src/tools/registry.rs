use crate::db::BuffetDb;
use crate::types::{AppError, Result, ToolDefinition};
use arc_swap::ArcSwap;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn parameters_schema(&self) -> Value;
    async fn execute(&self, args: Value) -> Result<String>;
}

/// Every capability the agent can be configured with, by stable name.
pub const CAPABILITY_NAMES: &[&str] = &[
    "create_category",
    "create_transaction",
    "search_category",
    "search_user_categories",
    "search_transactions",
    "update_transaction",
    "delete_transaction",
    "update_category",
    "delete_category",
];

fn construct(name: &str, db: &Arc<BuffetDb>) -> Option<Arc<dyn Tool>> {
    use crate::tools::{category, transaction};

    let tool: Arc<dyn Tool> = match name {
        "create_category" => Arc::new(category::CreateCategory::new(db.clone())),
        "search_category" => Arc::new(category::SearchCategory::new(db.clone())),
        "search_user_categories" => Arc::new(category::SearchUserCategories::new(db.clone())),
        "update_category" => Arc::new(category::UpdateCategory::new(db.clone())),
        "delete_category" => Arc::new(category::DeleteCategory::new(db.clone())),
        "create_transaction" => Arc::new(transaction::CreateTransaction::new(db.clone())),
        "search_transactions" => Arc::new(transaction::SearchTransactions::new(db.clone())),
        "update_transaction" => Arc::new(transaction::UpdateTransaction::new(db.clone())),
        "delete_transaction" => Arc::new(transaction::DeleteTransaction::new(db.clone())),
        _ => return None,
    };
    Some(tool)
}

pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get_tool_definitions(&self) -> Vec<ToolDefinition> {
        let mut definitions: Vec<ToolDefinition> = self
            .tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters_schema(),
            })
            .collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub async fn execute(&self, name: &str, args: Value) -> Result<String> {
        match self.tools.get(name) {
            Some(tool) => tool.execute(args).await,
            None => Err(AppError::ToolLoading(format!("Tool not found: {}", name))),
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

/// Atomically replaceable tool set.
///
/// Readers take a cheap snapshot via [`SharedToolRegistry::snapshot`];
/// `load` builds a complete replacement registry before swapping it in, so
/// a failed load never leaves a partially mutated set behind.
pub struct SharedToolRegistry {
    db: Arc<BuffetDb>,
    current: ArcSwap<ToolRegistry>,
    active_names: Mutex<Vec<String>>,
}

impl SharedToolRegistry {
    pub fn new(db: Arc<BuffetDb>) -> Self {
        Self {
            db,
            current: ArcSwap::from_pointee(ToolRegistry::new()),
            active_names: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Arc<ToolRegistry> {
        self.current.load_full()
    }

    /// Load the named capabilities, replacing the active set.
    ///
    /// A no-op when the requested names match what is already loaded. An
    /// unknown name fails the whole load and keeps the active set intact.
    pub fn load(&self, names: &[String]) -> Result<()> {
        let mut requested: Vec<String> = names.to_vec();
        requested.sort();
        requested.dedup();

        let mut active = self.active_names.lock();
        if *active == requested {
            return Ok(());
        }

        let registry = self.build(&requested)?;
        self.current.store(Arc::new(registry));
        *active = requested;
        Ok(())
    }

    /// Rebuild the active capability set from scratch.
    pub fn force_reload(&self) -> Result<()> {
        let active = self.active_names.lock();
        let registry = self.build(&active)?;
        self.current.store(Arc::new(registry));
        Ok(())
    }

    fn build(&self, names: &[String]) -> Result<ToolRegistry> {
        let mut registry = ToolRegistry::new();
        for name in names {
            let tool = construct(name, &self.db).ok_or_else(|| {
                AppError::ToolLoading(format!("Unknown tool capability: {}", name))
            })?;
            registry.register(tool);
        }
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input back"
        }

        fn parameters_schema(&self) -> Value {
            json!({
                "type": "object",
                "properties": { "text": { "type": "string" } },
                "required": ["text"]
            })
        }

        async fn execute(&self, args: Value) -> Result<String> {
            Ok(args["text"].as_str().unwrap_or_default().to_string())
        }
    }

    #[tokio::test]
    async fn test_registry_registration_and_execution() {
        let mut registry = ToolRegistry::new();
        assert!(registry.is_empty());

        registry.register(Arc::new(EchoTool));
        assert!(registry.has_tool("echo"));
        assert_eq!(registry.tool_names(), vec!["echo"]);

        let result = registry
            .execute("echo", json!({"text": "hello"}))
            .await
            .unwrap();
        assert_eq!(result, "hello");
    }

    #[tokio::test]
    async fn test_execute_unknown_tool_fails() {
        let registry = ToolRegistry::new();
        let err = registry.execute("missing", json!({})).await.unwrap_err();
        assert!(matches!(err, AppError::ToolLoading(_)));
    }

    #[test]
    fn test_tool_definitions_are_sorted() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let defs = registry.get_tool_definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
        assert!(defs[0].parameters["properties"]["text"].is_object());
    }

    #[test]
    fn test_capability_names_cover_nine_tools() {
        assert_eq!(CAPABILITY_NAMES.len(), 9);
    }
}
