//! Routing: classify the request with structured output and dispatch it to
//! a story, joke, or poem writer.
//!
//! ```bash
//! OPENAI_API_KEY=... cargo run --example routing -p agentflow-examples
//! ```

use agentflow_agent::routing::build_router;
use agentflow_core::config::RunnableConfig;
use agentflow_core::runnable::Runnable;
use agentflow_examples::setup;
use serde_json::json;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (_, model) = setup()?;
    let graph = build_router(model)?;

    let state = graph
        .invoke(
            json!({"input": "Write me a joke about cats"}),
            &RunnableConfig::default(),
        )
        .await?;

    println!("=== Routed to: {} ===", state["decision"].as_str().unwrap_or("?"));
    println!("{}", state["output"].as_str().unwrap_or_default());

    Ok(())
}
