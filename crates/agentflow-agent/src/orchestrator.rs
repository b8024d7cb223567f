//! Orchestrator-worker: a planner splits a report into sections, one worker
//! task per section is sent out dynamically, and a synthesizer joins the
//! finished sections in plan order.

use std::sync::Arc;

use agentflow_checkpoint::send::SendDirective;
use agentflow_core::error::Result;
use agentflow_core::message::Message;
use agentflow_core::model::ChatModel;
use agentflow_graph::compiled::CompiledStateGraph;
use agentflow_graph::edge::SendEdge;
use agentflow_graph::node::NodeFn;
use agentflow_graph::state_graph::StateGraph;
use agentflow_llm::structured::generate_structured;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::messages::state_str;

pub const ORCHESTRATOR: &str = "orchestrator";
pub const WORKER: &str = "llm_call";
pub const SYNTHESIZER: &str = "synthesizer";

/// Separator placed between completed sections in the final report.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

const PLANNER_PROMPT: &str = "Generate a plan for the report.";
const WORKER_PROMPT: &str = "Write a report section following the provided name and description. \
     Include no preamble for each section. Use markdown formatting.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Section {
    /// Name for this section of the report.
    pub name: String,
    /// Brief overview of the main topics and concepts to be covered in this section.
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Sections {
    /// Sections of the report.
    pub sections: Vec<Section>,
}

/// One directive per planned section, tagged with its position in the plan.
/// An empty plan goes straight to the synthesizer.
pub fn assign_workers(state: &Value) -> Vec<SendDirective> {
    let sections = state
        .get("sections")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    if sections.is_empty() {
        return vec![SendDirective::new(SYNTHESIZER, json!({}))];
    }
    sections
        .iter()
        .enumerate()
        .map(|(index, section)| {
            SendDirective::new(WORKER, json!({"section": section, "index": index}))
        })
        .collect()
}

/// Join completed sections in plan order, whatever order they finished in.
pub fn synthesize(completed: &Value) -> String {
    let mut parts: Vec<(u64, &str)> = completed
        .as_array()
        .into_iter()
        .flatten()
        .map(|item| {
            (
                item.get("index").and_then(Value::as_u64).unwrap_or(u64::MAX),
                item.get("content").and_then(Value::as_str).unwrap_or(""),
            )
        })
        .collect();
    parts.sort_by_key(|(index, _)| *index);
    parts
        .into_iter()
        .map(|(_, content)| content)
        .collect::<Vec<_>>()
        .join(SECTION_SEPARATOR)
}

/// `orchestrator` ⇒ N × `llm_call` → `synthesizer` → END.
///
/// Input `{"topic": ...}`. `completed_sections` is an append channel of
/// `{index, content}` items; `final_report` is the joined report.
pub fn build_orchestrator_worker(model: Arc<dyn ChatModel>) -> Result<CompiledStateGraph> {
    let mut graph = StateGraph::new();
    graph.add_append_channel("completed_sections");

    let planner = model.clone();
    graph.add_node(
        NodeFn::new(ORCHESTRATOR, move |state: Value, _config| {
            let model = planner.clone();
            async move {
                let messages = [
                    Message::system(PLANNER_PROMPT),
                    Message::user(format!(
                        "Here is the report topic: {}",
                        state_str(&state, "topic")
                    )),
                ];
                let plan: Sections = generate_structured(model.as_ref(), &messages).await?;
                tracing::debug!(sections = plan.sections.len(), "report planned");
                Ok(json!({"sections": plan.sections}))
            }
        })
        .with_outputs(["sections"]),
    )?;

    graph.add_node(
        NodeFn::new(WORKER, move |state: Value, _config| {
            let model = model.clone();
            async move {
                let section: Section = serde_json::from_value(state["section"].clone())?;
                let messages = [
                    Message::system(WORKER_PROMPT),
                    Message::user(format!(
                        "Here is the section name: {} and description: {}",
                        section.name, section.description
                    )),
                ];
                let result = model.generate(&messages, &Default::default()).await?;
                Ok(json!({"completed_sections": [{
                    "index": state["index"],
                    "content": result.message.content(),
                }]}))
            }
        })
        .with_outputs(["completed_sections"]),
    )?;

    graph.add_node(
        NodeFn::new(SYNTHESIZER, |state: Value, _config| async move {
            Ok(json!({"final_report": synthesize(&state["completed_sections"])}))
        })
        .with_outputs(["final_report"]),
    )?;

    graph.set_entry_point(ORCHESTRATOR)?;
    graph.add_send_edges(SendEdge::new(
        ORCHESTRATOR,
        assign_workers,
        [WORKER, SYNTHESIZER],
    ))?;
    graph.add_edge(WORKER, SYNTHESIZER)?;
    graph.set_finish_point(SYNTHESIZER)?;

    graph.compile()
}
