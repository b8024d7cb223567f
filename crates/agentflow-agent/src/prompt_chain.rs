//! Prompt chaining with a gate: generate a joke, and only when it fails the
//! punchline check, improve and polish it.

use std::sync::Arc;

use agentflow_core::error::Result;
use agentflow_core::model::ChatModel;
use agentflow_graph::compiled::CompiledStateGraph;
use agentflow_graph::constants::END;
use agentflow_graph::edge::ConditionalEdge;
use agentflow_graph::state_graph::StateGraph;
use serde_json::Value;

use crate::messages::state_str;
use crate::node::prompt_node;

pub const GENERATE: &str = "generate_joke";
pub const IMPROVE: &str = "improve_joke";
pub const POLISH: &str = "polish_joke";

pub const PASS: &str = "Pass";
pub const FAIL: &str = "Fail";

/// Gate over the generated joke: `Fail` when it contains `?` or `!`,
/// otherwise `Pass`.
pub fn check_punchline(joke: &str) -> &'static str {
    if joke.contains('?') || joke.contains('!') {
        FAIL
    } else {
        PASS
    }
}

/// `generate_joke` → gate → (`Pass`: END | `Fail`: `improve_joke` →
/// `polish_joke` → END).
///
/// Input `{"topic": ...}`; writes `joke`, then `improved_joke` and
/// `final_joke` on the `Fail` branch.
pub fn build_prompt_chain(model: Arc<dyn ChatModel>) -> Result<CompiledStateGraph> {
    let mut graph = StateGraph::new();

    graph.add_node(prompt_node(GENERATE, model.clone(), "joke", |state| {
        format!("Write a short joke about {}", state_str(state, "topic"))
    }))?;
    graph.add_node(prompt_node(IMPROVE, model.clone(), "improved_joke", |state| {
        format!(
            "Make this joke funnier by adding wordplay: {}",
            state_str(state, "joke")
        )
    }))?;
    graph.add_node(prompt_node(POLISH, model, "final_joke", |state| {
        format!(
            "Add a surprising twist to this joke: {}",
            state_str(state, "improved_joke")
        )
    }))?;

    graph.set_entry_point(GENERATE)?;
    graph.add_conditional_edges(ConditionalEdge::new(
        GENERATE,
        |state: &Value| check_punchline(state_str(state, "joke")).to_string(),
        [(FAIL, IMPROVE), (PASS, END)],
    ))?;
    graph.add_edge(IMPROVE, POLISH)?;
    graph.set_finish_point(POLISH)?;

    graph.compile()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_labels() {
        assert_eq!(check_punchline("Cats are great"), PASS);
        assert_eq!(check_punchline("Why did the cat sit on the laptop?"), FAIL);
        assert_eq!(check_punchline("Meow!"), FAIL);
        assert_eq!(check_punchline(""), PASS);
    }
}
