//! Augmented LLM: structured output and tool binding without a graph.
//!
//! ```bash
//! OPENAI_API_KEY=... cargo run --example augmented_llm -p agentflow-examples
//! ```

use std::sync::Arc;

use agentflow_agent::augmented::{request_tool_calls, search_query};
use agentflow_agent::tools::MultiplyTool;
use agentflow_core::tool::ToolRegistry;
use agentflow_examples::setup;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (_, model) = setup()?;

    println!("=== Structured output ===");
    let query = search_query(
        model.as_ref(),
        "How does Calcium CT score relate to high cholesterol?",
    )
    .await?;
    println!("search_query:  {}", query.search_query.unwrap_or_default());
    println!("justification: {}", query.justification.unwrap_or_default());

    println!("\n=== Tool binding ===");
    let registry = ToolRegistry::new().with(Arc::new(MultiplyTool));
    let calls = request_tool_calls(model.as_ref(), &registry, "What is 2 times 3?").await?;
    for call in calls {
        println!("{} ({}): {}", call.name, call.id, call.arguments);
    }

    Ok(())
}
