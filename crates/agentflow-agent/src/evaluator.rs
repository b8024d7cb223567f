//! Evaluator-optimizer: a generator writes a joke, an evaluator grades it,
//! and rejected jokes go back to the generator with feedback.
//!
//! The loop is capped: the generator refuses to start round
//! `max_rounds + 1` and fails with `GraphError::MaxIterationsExceeded`,
//! wrapped in the run error for the generator node.

use std::sync::Arc;

use agentflow_core::error::{GraphError, Result};
use agentflow_core::message::Message;
use agentflow_core::model::ChatModel;
use agentflow_graph::channel::AggregateOp;
use agentflow_graph::compiled::CompiledStateGraph;
use agentflow_graph::constants::END;
use agentflow_graph::edge::ConditionalEdge;
use agentflow_graph::node::NodeFn;
use agentflow_graph::state_graph::StateGraph;
use agentflow_llm::structured::generate_structured;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::messages::state_str;

pub const GENERATOR: &str = "llm_call_generator";
pub const EVALUATOR: &str = "llm_call_evaluator";

pub const ACCEPTED: &str = "Accepted";
pub const REJECTED: &str = "Rejected + Feedback";

/// Default cap on generate/evaluate rounds.
pub const DEFAULT_MAX_ROUNDS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub enum Grade {
    #[serde(rename = "funny")]
    Funny,
    #[serde(rename = "not funny")]
    NotFunny,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Funny => "funny",
            Grade::NotFunny => "not funny",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Feedback {
    /// Decide if the joke is funny or not.
    pub grade: Grade,
    /// If the joke is not funny, provide feedback on how to improve it.
    pub feedback: String,
}

#[derive(Debug, Clone)]
pub struct EvaluatorOptions {
    pub max_rounds: usize,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
        }
    }
}

pub fn generator_prompt(topic: &str, feedback: &str) -> String {
    if feedback.is_empty() {
        format!("Write a joke about {topic}")
    } else {
        format!("Write a joke about {topic} but take into account the feedback: {feedback}")
    }
}

/// Any grade other than `funny` is a rejection.
pub fn route_joke(state: &Value) -> String {
    match state_str(state, "funny_or_not") {
        "funny" => ACCEPTED.to_string(),
        _ => REJECTED.to_string(),
    }
}

/// START → `llm_call_generator` → `llm_call_evaluator` → (`Accepted`: END |
/// `Rejected + Feedback`: back to the generator).
///
/// Input `{"topic": ...}`; writes `joke`, `funny_or_not`, `feedback` and the
/// `rounds` counter.
pub fn build_evaluator_optimizer(
    model: Arc<dyn ChatModel>,
    options: EvaluatorOptions,
) -> Result<CompiledStateGraph> {
    let mut graph = StateGraph::new();
    graph.add_binary_operator_channel("rounds", json!(0), AggregateOp::Sum);

    let max_rounds = options.max_rounds;
    let writer = model.clone();
    graph.add_node(
        NodeFn::new(GENERATOR, move |state: Value, _config| {
            let model = writer.clone();
            async move {
                let rounds = state["rounds"].as_u64().unwrap_or(0) as usize;
                if rounds >= max_rounds {
                    tracing::warn!(rounds, "evaluator never accepted the joke");
                    return Err(GraphError::MaxIterationsExceeded { limit: max_rounds }.into());
                }
                let prompt =
                    generator_prompt(state_str(&state, "topic"), state_str(&state, "feedback"));
                let joke = model.complete(&prompt).await?;
                Ok(json!({"joke": joke, "rounds": 1}))
            }
        })
        .with_outputs(["joke", "rounds"]),
    )?;

    graph.add_node(
        NodeFn::new(EVALUATOR, move |state: Value, _config| {
            let model = model.clone();
            async move {
                let messages = [Message::user(format!(
                    "Grade the joke {}",
                    state_str(&state, "joke")
                ))];
                let grade: Feedback = generate_structured(model.as_ref(), &messages).await?;
                tracing::debug!(grade = grade.grade.as_str(), "joke graded");
                Ok(json!({"funny_or_not": grade.grade.as_str(), "feedback": grade.feedback}))
            }
        })
        .with_outputs(["funny_or_not", "feedback"]),
    )?;

    graph.set_entry_point(GENERATOR)?;
    graph.add_edge(GENERATOR, EVALUATOR)?;
    graph.add_conditional_edges(ConditionalEdge::new(
        EVALUATOR,
        route_joke,
        [(ACCEPTED, END), (REJECTED, GENERATOR)],
    ))?;

    graph.compile()
}
