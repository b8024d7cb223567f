//! Orchestrator-worker: plan report sections, write each one in a dynamically
//! spawned worker, then join them into a report.
//!
//! ```bash
//! OPENAI_API_KEY=... cargo run --example orchestrator_worker -p agentflow-examples
//! ```

use agentflow_agent::orchestrator::{WORKER, build_orchestrator_worker};
use agentflow_core::config::RunnableConfig;
use agentflow_examples::setup;
use serde_json::json;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (_, model) = setup()?;
    let graph = build_orchestrator_worker(model)?;

    let state = graph
        .invoke_with_observer(
            json!({"topic": "Create a report on LLM scaling laws"}),
            &RunnableConfig::default(),
            |info| {
                if info.node == WORKER {
                    let name = &info.update["completed_sections"][0]["name"];
                    tracing::info!(section = %name, "section written");
                }
            },
        )
        .await?;

    println!("{}", state["final_report"].as_str().unwrap_or_default());

    Ok(())
}
