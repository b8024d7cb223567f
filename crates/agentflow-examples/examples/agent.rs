//! Tool-calling agent: the model calls arithmetic tools until it can answer.
//!
//! ```bash
//! OPENAI_API_KEY=... cargo run --example agent -p agentflow-examples
//! ```

use std::sync::Arc;

use agentflow_agent::messages::parse_messages;
use agentflow_agent::tool_calling::{ToolCallingOptions, create_tool_calling_agent};
use agentflow_agent::tools::{AddTool, DivideTool, MultiplyTool};
use agentflow_core::config::RunnableConfig;
use agentflow_core::runnable::Runnable;
use agentflow_core::tool::{Tool, ToolRegistry};
use agentflow_examples::setup;
use serde_json::json;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (_, model) = setup()?;
    let tools: Vec<Arc<dyn Tool>> = vec![
        Arc::new(AddTool),
        Arc::new(MultiplyTool),
        Arc::new(DivideTool),
    ];
    let tools: ToolRegistry = tools.into_iter().collect();
    let options = ToolCallingOptions::default().with_system_prompt(
        "You are a helpful assistant tasked with performing arithmetic on a set of inputs.",
    );
    let graph = create_tool_calling_agent(model, tools, options)?;

    let state = graph
        .invoke(
            json!({"messages": [{"type": "user", "content": "Add 3 and 4."}]}),
            &RunnableConfig::default(),
        )
        .await?;

    for message in parse_messages(&state["messages"])? {
        print!("{message}");
    }

    Ok(())
}
