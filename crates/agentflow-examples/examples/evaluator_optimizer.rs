//! Evaluator-optimizer: a generator writes jokes until the evaluator grades
//! one funny or the round cap is reached.
//!
//! ```bash
//! OPENAI_API_KEY=... cargo run --example evaluator_optimizer -p agentflow-examples
//! ```

use agentflow_agent::evaluator::{EvaluatorOptions, build_evaluator_optimizer};
use agentflow_core::config::RunnableConfig;
use agentflow_core::runnable::Runnable;
use agentflow_examples::setup;
use serde_json::json;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (_, model) = setup()?;
    let graph = build_evaluator_optimizer(model, EvaluatorOptions::default())?;

    match graph
        .invoke(json!({"topic": "Cats"}), &RunnableConfig::default())
        .await
    {
        Ok(state) => {
            println!(
                "=== Accepted after {} round(s) ===",
                state["rounds"].as_u64().unwrap_or(0)
            );
            println!("{}", state["joke"].as_str().unwrap_or_default());
        }
        Err(err) => match err.iteration_limit() {
            Some(limit) => println!("No joke was accepted within {limit} rounds."),
            None => return Err(err.into()),
        },
    }

    Ok(())
}
