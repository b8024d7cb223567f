use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::RunnableConfig;
use crate::error::{Result, ToolError};

/// Definition of a tool that can be called by a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The name of the tool.
    pub name: String,

    /// A description of what the tool does.
    pub description: String,

    /// JSON Schema describing the tool's input parameters.
    pub parameters: serde_json::Value,
}

/// Result of a tool run: the text for the tool message plus state fields
/// the tool writes directly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    pub content: String,
    pub update: Map<String, Value>,
}

impl ToolOutput {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            update: Map::new(),
        }
    }

    pub fn with_update(mut self, field: impl Into<String>, value: Value) -> Self {
        self.update.insert(field.into(), value);
        self
    }
}

/// Trait for callable tools.
///
/// Tools accept JSON input and return string output. The config of the
/// calling graph node is passed through so a tool can interrupt the run
/// and read the resume value.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Return the tool's definition including its JSON Schema.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given JSON input.
    async fn call(&self, input: serde_json::Value, config: &RunnableConfig) -> Result<String>;

    /// State fields this tool may write through [`ToolOutput::update`].
    fn state_fields(&self) -> Vec<String> {
        Vec::new()
    }

    /// Execute the tool, returning its message text and state updates.
    /// Tools that only produce text keep the default.
    async fn run(&self, input: serde_json::Value, config: &RunnableConfig) -> Result<ToolOutput> {
        self.call(input, config).await.map(ToolOutput::text)
    }
}

/// Name-indexed collection of tools, resolved at call time.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool under its definition name, replacing any previous
    /// tool with the same name.
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> &mut Self {
        self.tools.insert(tool.definition().name, tool);
        self
    }

    /// Builder-style registration.
    pub fn with(mut self, tool: Arc<dyn Tool>) -> Self {
        self.register(tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Tool>> {
        self.tools.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions of every registered tool, ordered by name.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.values().map(|t| t.definition()).collect()
    }

    /// Every state field a registered tool may write, sorted and deduplicated.
    pub fn state_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.tools.values().flat_map(|t| t.state_fields()).collect();
        fields.sort();
        fields.dedup();
        fields
    }

    /// Invoke a tool by name, returning only its message text.
    ///
    /// Fails with `ToolError::NotFound` when no tool is registered under `name`.
    pub async fn invoke(
        &self,
        name: &str,
        args: serde_json::Value,
        config: &RunnableConfig,
    ) -> Result<String> {
        Ok(self.run(name, args, config).await?.content)
    }

    /// Invoke a tool by name, keeping its state updates.
    pub async fn run(
        &self,
        name: &str,
        args: serde_json::Value,
        config: &RunnableConfig,
    ) -> Result<ToolOutput> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::NotFound(name.to_string()))?;
        tracing::debug!(tool = name, "invoking tool");
        tool.run(args, config).await
    }
}

impl FromIterator<Arc<dyn Tool>> for ToolRegistry {
    fn from_iter<I: IntoIterator<Item = Arc<dyn Tool>>>(tools: I) -> Self {
        let mut registry = Self::new();
        for tool in tools {
            registry.register(tool);
        }
        registry
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FlowError;

    struct SumTool;

    #[async_trait]
    impl Tool for SumTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "sum".into(),
                description: "Adds a list of numbers".into(),
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "values": {"type": "array", "items": {"type": "number"}}
                    },
                    "required": ["values"]
                }),
            }
        }

        async fn call(&self, input: serde_json::Value, _config: &RunnableConfig) -> Result<String> {
            let values = input
                .get("values")
                .and_then(|v| v.as_array())
                .ok_or_else(|| ToolError::InvalidInput("missing 'values' field".into()))?;
            let total: f64 = values.iter().filter_map(|v| v.as_f64()).sum();
            Ok(total.to_string())
        }
    }

    #[tokio::test]
    async fn registry_invokes_by_name() {
        let registry = ToolRegistry::new().with(Arc::new(SumTool));
        let config = RunnableConfig::default();
        let out = registry
            .invoke("sum", serde_json::json!({"values": [1, 2, 3.5]}), &config)
            .await
            .unwrap();
        assert_eq!(out, "6.5");
    }

    #[tokio::test]
    async fn registry_unknown_tool() {
        let registry = ToolRegistry::new().with(Arc::new(SumTool));
        let err = registry
            .invoke("missing", serde_json::json!({}), &RunnableConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Tool(ToolError::NotFound(ref n)) if n == "missing"));
    }

    #[tokio::test]
    async fn tool_input_validation_propagates() {
        let registry = ToolRegistry::new().with(Arc::new(SumTool));
        let err = registry
            .invoke("sum", serde_json::json!({"wrong": 1}), &RunnableConfig::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Tool(ToolError::InvalidInput(_))));
    }

    /// Writes the total to state as well as to the message.
    struct TallyTool;

    #[async_trait]
    impl Tool for TallyTool {
        fn definition(&self) -> ToolDefinition {
            ToolDefinition {
                name: "tally".into(),
                description: "Counts its input keys".into(),
                parameters: serde_json::json!({"type": "object"}),
            }
        }

        async fn call(&self, input: Value, config: &RunnableConfig) -> Result<String> {
            Ok(self.run(input, config).await?.content)
        }

        fn state_fields(&self) -> Vec<String> {
            vec!["tally".into(), "total".into()]
        }

        async fn run(&self, input: Value, _config: &RunnableConfig) -> Result<ToolOutput> {
            let count = input.as_object().map_or(0, |m| m.len());
            Ok(ToolOutput::text(count.to_string()).with_update("tally", serde_json::json!(count)))
        }
    }

    #[tokio::test]
    async fn run_keeps_state_updates_and_invoke_drops_them() {
        let registry = ToolRegistry::new().with(Arc::new(SumTool)).with(Arc::new(TallyTool));
        let config = RunnableConfig::default();
        let args = serde_json::json!({"a": 1, "b": 2});

        let output = registry.run("tally", args.clone(), &config).await.unwrap();
        assert_eq!(output.content, "2");
        assert_eq!(output.update["tally"], 2);
        assert_eq!(registry.invoke("tally", args, &config).await.unwrap(), "2");

        let plain = registry
            .run("sum", serde_json::json!({"values": [1]}), &config)
            .await
            .unwrap();
        assert!(plain.update.is_empty());
        assert_eq!(registry.state_fields(), vec!["tally", "total"]);
    }

    #[test]
    fn registry_from_iterator_and_definitions() {
        let tools: Vec<Arc<dyn Tool>> = vec![Arc::new(SumTool), Arc::new(SumTool)];
        let registry: ToolRegistry = tools.into_iter().collect();
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("sum"));
        assert_eq!(registry.definitions()[0].name, "sum");
        assert_eq!(format!("{registry:?}"), r#"ToolRegistry { tools: ["sum"] }"#);
    }
}
