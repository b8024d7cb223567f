//! The augmented LLM building blocks: structured output and tool binding,
//! used directly without a graph.

use agentflow_core::error::Result;
use agentflow_core::message::{Message, ToolCall};
use agentflow_core::model::{CallOptions, ChatModel};
use agentflow_core::tool::ToolRegistry;
use agentflow_llm::structured::generate_structured;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SearchQuery {
    /// Query that is optimized for web search.
    #[serde(default)]
    pub search_query: Option<String>,
    /// Why this query is relevant to the user's request.
    #[serde(default)]
    pub justification: Option<String>,
}

/// Turn a question into a web search query.
pub async fn search_query(model: &dyn ChatModel, question: &str) -> Result<SearchQuery> {
    generate_structured(model, &[Message::user(question)]).await
}

/// Offer the registry's tools to the model and return the calls it asks for,
/// without executing them.
pub async fn request_tool_calls(
    model: &dyn ChatModel,
    registry: &ToolRegistry,
    prompt: &str,
) -> Result<Vec<ToolCall>> {
    let options = CallOptions {
        tools: registry.definitions(),
        ..Default::default()
    };
    let result = model.generate(&[Message::user(prompt)], &options).await?;
    Ok(result.message.tool_calls().to_vec())
}
