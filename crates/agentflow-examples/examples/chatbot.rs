//! Human-in-the-loop chatbot: web search plus a review tool that pauses the
//! run until a human answers.
//!
//! ```bash
//! OPENAI_API_KEY=... TAVILY_API_KEY=... cargo run --example chatbot -p agentflow-examples
//! ```

use std::sync::Arc;

use agentflow_agent::chatbot::{ChatSession, build_chatbot};
use agentflow_agent::tools::{HumanAssistanceTool, WebSearchTool};
use agentflow_checkpoint::memory::MemoryCheckpointStore;
use agentflow_core::message::Message;
use agentflow_core::tool::ToolRegistry;
use agentflow_examples::setup;
use serde_json::json;

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let (settings, model) = setup()?;
    let tools = ToolRegistry::new()
        .with(Arc::new(WebSearchTool::new(settings.require_tavily_key()?)))
        .with(Arc::new(HumanAssistanceTool));
    let graph = build_chatbot(model, tools)?;
    let store = MemoryCheckpointStore::new();
    let session = ChatSession::new(&graph, &store, "1");

    let question = "Can you look up when LangGraph was released? \
        When you have the answer, use the human_assistance tool for review.";
    println!("{}", Message::user(question));

    let output = session.send(question, |m| print!("{m}")).await?;
    if let Some(payload) = output.interrupt_value() {
        println!("\n=== Waiting for review: {payload} ===\n");
        let reply = json!({"name": "LangGraph", "birthday": "Jan 17, 2024"});
        session.resume(reply, |m| print!("{m}")).await?;
    }

    Ok(())
}
