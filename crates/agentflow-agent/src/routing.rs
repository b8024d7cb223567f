//! Routing: a structured-output call classifies the request, and a router
//! sends it to the matching writer.

use std::sync::Arc;

use agentflow_core::error::Result;
use agentflow_core::message::Message;
use agentflow_core::model::ChatModel;
use agentflow_graph::compiled::CompiledStateGraph;
use agentflow_graph::edge::ConditionalEdge;
use agentflow_graph::node::NodeFn;
use agentflow_graph::state_graph::StateGraph;
use agentflow_llm::structured::generate_structured;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::messages::state_str;
use crate::node::prompt_node;

pub const ROUTER: &str = "llm_call_router";
pub const STORY: &str = "write_story";
pub const JOKE: &str = "write_joke";
pub const POEM: &str = "write_poem";

const ROUTER_PROMPT: &str = "Route the input story, joke, or poem based on the user's request.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum RouteStep {
    Poem,
    Story,
    Joke,
}

impl RouteStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteStep::Poem => "poem",
            RouteStep::Story => "story",
            RouteStep::Joke => "joke",
        }
    }
}

/// Routing decision returned by the classifier.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Route {
    /// The next step in the routing process.
    pub step: RouteStep,
}

/// `llm_call_router` → one of `write_story` / `write_joke` / `write_poem` → END.
///
/// Input `{"input": ...}`; writes `decision` and `output`. The labels of the
/// router are the decision strings themselves.
pub fn build_router(model: Arc<dyn ChatModel>) -> Result<CompiledStateGraph> {
    let mut graph = StateGraph::new();

    let classifier = model.clone();
    graph.add_node(
        NodeFn::new(ROUTER, move |state: Value, _config| {
            let model = classifier.clone();
            async move {
                let messages = [
                    Message::system(ROUTER_PROMPT),
                    Message::user(state_str(&state, "input")),
                ];
                let route: Route = generate_structured(model.as_ref(), &messages).await?;
                tracing::debug!(step = route.step.as_str(), "routed request");
                Ok(json!({"decision": route.step.as_str()}))
            }
        })
        .with_outputs(["decision"]),
    )?;

    for name in [STORY, JOKE, POEM] {
        graph.add_node(prompt_node(name, model.clone(), "output", |state| {
            state_str(state, "input").to_string()
        }))?;
        graph.set_finish_point(name)?;
    }

    graph.set_entry_point(ROUTER)?;
    graph.add_conditional_edges(ConditionalEdge::new(
        ROUTER,
        |state: &Value| state_str(state, "decision").to_string(),
        [("story", STORY), ("joke", JOKE), ("poem", POEM)],
    ))?;

    graph.compile()
}
