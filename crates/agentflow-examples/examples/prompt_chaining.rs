//! Prompt chaining: generate a joke, gate on the punchline, then improve
//! and polish it when the gate fails.
//!
//! ```bash
//! OPENAI_API_KEY=... cargo run --example prompt_chaining -p agentflow-examples
//! ```

use agentflow_agent::prompt_chain::build_prompt_chain;
use agentflow_core::config::RunnableConfig;
use agentflow_core::runnable::Runnable;
use agentflow_examples::setup;
use serde_json::json;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (_, model) = setup()?;
    let graph = build_prompt_chain(model)?;

    let state = graph
        .invoke(json!({"topic": "cats"}), &RunnableConfig::default())
        .await?;

    println!("Initial joke:");
    println!("{}", state["joke"].as_str().unwrap_or_default());
    println!("\n--- --- ---\n");
    match state["final_joke"].as_str() {
        Some(final_joke) => {
            println!("Improved joke:");
            println!("{}", state["improved_joke"].as_str().unwrap_or_default());
            println!("\n--- --- ---\n");
            println!("Final joke:");
            println!("{final_joke}");
        }
        None => println!("Joke failed quality gate - no punchline detected!"),
    }

    Ok(())
}
