//! Parallelization: three independent writers fan out from the entry and an
//! aggregator joins once all of them have finished.

use std::sync::Arc;

use agentflow_core::error::Result;
use agentflow_core::model::ChatModel;
use agentflow_graph::compiled::CompiledStateGraph;
use agentflow_graph::node::NodeFn;
use agentflow_graph::state_graph::StateGraph;
use serde_json::{Value, json};

use crate::messages::state_str;
use crate::node::prompt_node;

pub const JOKE: &str = "call_llm_joke";
pub const STORY: &str = "call_llm_story";
pub const POEM: &str = "call_llm_poem";
pub const AGGREGATOR: &str = "aggregator";

pub fn combine_outputs(topic: &str, story: &str, joke: &str, poem: &str) -> String {
    format!(
        "Here's a story, joke, and poem about {topic}!\n\n\
         STORY:\n{story}\n\n\
         JOKE:\n{joke}\n\n\
         POEM:\n{poem}"
    )
}

/// START → {joke, story, poem} → `aggregator` → END.
///
/// The three writers run in one super-step; the aggregator runs once in the
/// next and writes `combined_output`.
pub fn build_parallel(model: Arc<dyn ChatModel>) -> Result<CompiledStateGraph> {
    let mut graph = StateGraph::new();

    let writers = [(JOKE, "joke"), (STORY, "story"), (POEM, "poem")];
    for (name, kind) in writers {
        graph.add_node(prompt_node(name, model.clone(), kind, move |state| {
            format!("Write a {kind} about {}", state_str(state, "topic"))
        }))?;
        graph.set_entry_point(name)?;
    }

    graph.add_node(
        NodeFn::new(AGGREGATOR, |state: Value, _config| async move {
            let combined = combine_outputs(
                state_str(&state, "topic"),
                state_str(&state, "story"),
                state_str(&state, "joke"),
                state_str(&state, "poem"),
            );
            Ok(json!({"combined_output": combined}))
        })
        .with_outputs(["combined_output"]),
    )?;
    for (name, _) in writers {
        graph.add_edge(name, AGGREGATOR)?;
    }
    graph.set_finish_point(AGGREGATOR)?;

    graph.compile()
}
