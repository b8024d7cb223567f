//! Human-in-the-loop chatbot: a tool-calling agent whose conversation
//! survives interrupts through a checkpoint store.

use std::sync::Arc;

use agentflow_checkpoint::config_ext::CheckpointConfigExt;
use agentflow_checkpoint::store::CheckpointStore;
use agentflow_checkpoint::types::GraphOutput;
use agentflow_core::config::RunnableConfig;
use agentflow_core::error::Result;
use agentflow_core::message::Message;
use agentflow_core::model::ChatModel;
use agentflow_core::tool::ToolRegistry;
use agentflow_graph::compiled::{CompiledStateGraph, StepInfo};
use serde_json::{Value, json};

use crate::messages::{message_value, parse_messages};
use crate::tool_calling::{ToolCallingOptions, create_tool_calling_agent};

/// The chatbot graph: the tool-calling loop with no system prompt.
pub fn build_chatbot(model: Arc<dyn ChatModel>, tools: ToolRegistry) -> Result<CompiledStateGraph> {
    create_tool_calling_agent(model, tools, ToolCallingOptions::default())
}

/// New messages written by a committed step, for printing as they arrive.
pub fn step_messages(info: &StepInfo) -> Vec<Message> {
    let update = &info.update["messages"];
    let items = match update {
        Value::Array(_) => parse_messages(update),
        Value::Null => Ok(Vec::new()),
        single => parse_messages(&Value::Array(vec![single.clone()])),
    };
    items.unwrap_or_else(|err| {
        tracing::warn!(node = %info.node, error = %err, "skipping unparseable message update");
        Vec::new()
    })
}

/// One conversation thread over a chatbot graph and a checkpoint store.
pub struct ChatSession<'a> {
    graph: &'a CompiledStateGraph,
    store: &'a dyn CheckpointStore,
    config: RunnableConfig,
}

impl<'a> ChatSession<'a> {
    pub fn new(
        graph: &'a CompiledStateGraph,
        store: &'a dyn CheckpointStore,
        thread_id: impl Into<String>,
    ) -> Self {
        Self {
            graph,
            store,
            config: RunnableConfig::default().with_thread_id(thread_id),
        }
    }

    pub fn thread_id(&self) -> Option<String> {
        self.config.thread_id()
    }

    /// Start a run with a user message, reporting each new message.
    pub async fn send<F>(&self, text: &str, on_message: F) -> Result<GraphOutput>
    where
        F: Fn(&Message) + Send + Sync,
    {
        let input = json!({"messages": [message_value(&Message::user(text))?]});
        self.graph
            .invoke_resumable_with_observer(input, &self.config, self.store, |info| {
                step_messages(info).iter().for_each(&on_message)
            })
            .await
    }

    /// Answer the pending interrupt, reporting each new message.
    pub async fn resume<F>(&self, reply: Value, on_message: F) -> Result<GraphOutput>
    where
        F: Fn(&Message) + Send + Sync,
    {
        self.graph
            .resume_with_observer(&self.config, reply, self.store, |info| {
                step_messages(info).iter().for_each(&on_message)
            })
            .await
    }
}
