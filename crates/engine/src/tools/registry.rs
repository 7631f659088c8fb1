use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;

use crate::llm::types::ToolDefinition;

/// Handler function signature: takes decoded args, returns JSON or an error string.
pub type ToolHandler = Arc<
    dyn Fn(Value) -> Pin<Box<dyn Future<Output = Result<Value, String>> + Send>> + Send + Sync,
>;

/// Catalog of invocable tools and the schemas advertised to the model.
///
/// Definitions and handlers are only ever added together, so the advertised
/// names and the invocable names are the same set. Built once at startup and
/// shared read-only.
#[derive(Default)]
pub struct ToolRegistry {
    handlers: HashMap<String, ToolHandler>,
    definitions: Vec<ToolDefinition>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Re-registering a name replaces both schema and handler.
    pub fn register(&mut self, definition: ToolDefinition, handler: ToolHandler) {
        match self
            .definitions
            .iter_mut()
            .find(|d| d.name == definition.name)
        {
            Some(existing) => *existing = definition.clone(),
            None => self.definitions.push(definition.clone()),
        }
        self.handlers.insert(definition.name, handler);
    }

    /// Get the tool definitions for sending to the LLM.
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Look up the handler for a model-requested tool name.
    pub fn handler(&self, name: &str) -> Option<&ToolHandler> {
        self.handlers.get(name)
    }

    /// Names of all invocable tools, in advertised order.
    pub fn names(&self) -> Vec<&str> {
        self.definitions.iter().map(|d| d.name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}
