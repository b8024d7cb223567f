//! Parallelization: three writers run in the same step and an aggregator
//! combines their outputs.
//!
//! ```bash
//! OPENAI_API_KEY=... cargo run --example parallelization -p agentflow-examples
//! ```

use agentflow_agent::parallel::build_parallel;
use agentflow_core::config::RunnableConfig;
use agentflow_examples::setup;
use serde_json::json;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (_, model) = setup()?;
    let graph = build_parallel(model)?;

    let state = graph
        .invoke_with_observer(json!({"topic": "cats"}), &RunnableConfig::default(), |info| {
            tracing::info!(step = info.step, node = %info.node, "finished");
        })
        .await?;

    println!("{}", state["combined_output"].as_str().unwrap_or_default());

    Ok(())
}
