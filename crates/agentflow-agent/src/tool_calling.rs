use std::sync::Arc;

use agentflow_core::error::{GraphError, Result};
use agentflow_core::message::Message;
use agentflow_core::model::{CallOptions, ChatModel};
use agentflow_core::tool::ToolRegistry;
use agentflow_graph::channel::AggregateOp;
use agentflow_graph::compiled::CompiledStateGraph;
use agentflow_graph::constants::END;
use agentflow_graph::edge::ConditionalEdge;
use agentflow_graph::node::NodeFn;
use agentflow_graph::state_graph::StateGraph;
use serde_json::{Value, json};

use crate::messages::{last_message_has_tool_calls, last_tool_calls, message_value, parse_messages};

pub const AGENT: &str = "agent";
pub const TOOLS: &str = "tools";

/// Default cap on model turns that request tools.
pub const DEFAULT_MAX_ITERATIONS: usize = 10;

#[derive(Debug, Clone)]
pub struct ToolCallingOptions {
    /// System message prepended to the conversation when it has none.
    pub system_prompt: Option<String>,
    /// Model turns that may request tools before the run fails with
    /// `MaxIterationsExceeded`.
    pub max_iterations: usize,
}

impl Default for ToolCallingOptions {
    fn default() -> Self {
        Self {
            system_prompt: None,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl ToolCallingOptions {
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(prompt.into());
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }
}

/// Create a tool-calling agent graph that uses native tool calls.
///
/// The graph follows the cycle: `agent` -> `tools` -> `agent` -> ... -> END
///
/// - The **agent** node calls the `ChatModel` with the conversation and the
///   registry's tool definitions.
/// - If the reply requests tools, the **tools** node executes each call by
///   name through the registry and appends one tool message per call.
/// - The cycle ends when the model answers without tool calls.
///
/// # State schema
/// - `messages`: append channel holding the conversation as JSON messages
/// - `iterations`: sum channel counting tool-requesting model turns
/// - any field a registered tool declares in `Tool::state_fields`
///
/// Tools receive the node's config, so a tool may call `interrupt` and the
/// run can be resumed from a checkpoint.
pub fn create_tool_calling_agent(
    model: Arc<dyn ChatModel>,
    registry: ToolRegistry,
    options: ToolCallingOptions,
) -> Result<CompiledStateGraph> {
    let call_options = CallOptions {
        tools: registry.definitions(),
        ..Default::default()
    };
    let mut tool_outputs = vec!["messages".to_string()];
    tool_outputs.extend(registry.state_fields());
    let registry = Arc::new(registry);
    let system_prompt = options.system_prompt.clone();
    let max_iterations = options.max_iterations;

    let mut graph = StateGraph::new();
    graph.add_append_channel("messages");
    graph.add_binary_operator_channel("iterations", json!(0), AggregateOp::Sum);

    graph.add_node(
        NodeFn::new(AGENT, move |state: Value, _config| {
            let model = model.clone();
            let call_options = call_options.clone();
            let system_prompt = system_prompt.clone();
            async move {
                let iterations = state["iterations"].as_u64().unwrap_or(0) as usize;
                if iterations >= max_iterations {
                    tracing::warn!(iterations, "tool loop did not converge");
                    return Err(GraphError::MaxIterationsExceeded {
                        limit: max_iterations,
                    }
                    .into());
                }

                let mut messages = parse_messages(&state["messages"])?;
                if let Some(prompt) = system_prompt {
                    if !messages.iter().any(|m| matches!(m, Message::System { .. })) {
                        messages.insert(0, Message::system(prompt));
                    }
                }

                let result = model.generate(&messages, &call_options).await?;
                let requested = !result.message.tool_calls().is_empty();
                tracing::debug!(tool_calls = result.message.tool_calls().len(), "agent turn");
                Ok(json!({
                    "messages": message_value(&result.message)?,
                    "iterations": usize::from(requested),
                }))
            }
        })
        .with_outputs(["messages", "iterations"]),
    )?;

    graph.add_node(
        NodeFn::new(TOOLS, move |state: Value, config| {
            let registry = registry.clone();
            async move {
                let messages = parse_messages(&state["messages"])?;
                let mut update = serde_json::Map::new();
                let mut results = Vec::new();
                for call in last_tool_calls(&messages) {
                    let output = registry
                        .run(&call.name, call.arguments.clone(), &config)
                        .await?;
                    // Later calls of the same turn win on shared fields.
                    update.extend(output.update);
                    results.push(message_value(&Message::tool(output.content, &call.id))?);
                }
                update.insert("messages".to_string(), Value::Array(results));
                Ok(Value::Object(update))
            }
        })
        .with_outputs(tool_outputs),
    )?;

    graph.set_entry_point(AGENT)?;
    graph.add_conditional_edges(ConditionalEdge::new(
        AGENT,
        |state: &Value| {
            if last_message_has_tool_calls(state) {
                TOOLS.to_string()
            } else {
                "end".to_string()
            }
        },
        [(TOOLS, TOOLS), ("end", END)],
    ))?;
    graph.add_edge(TOOLS, AGENT)?;

    graph.compile()
}
