use std::sync::Arc;

use agentflow_core::config::{InterruptScratchpad, RunnableConfig};
use serde_json::{Value, json};

use crate::interrupt::config_keys;

/// Extension trait for reading and writing checkpoint values on a
/// [`RunnableConfig`].
pub trait CheckpointConfigExt {
    fn with_thread_id(self, thread_id: impl Into<String>) -> Self;
    fn with_checkpoint_id(self, checkpoint_id: impl Into<String>) -> Self;
    /// Answer the first `interrupt` call of the task.
    fn with_resume_value(self, value: Value) -> Self;
    /// Answer the task's `interrupt` calls in order, one value per call.
    fn with_resume_values(self, values: Vec<Value>) -> Self;
    fn without_resume_values(self) -> Self;
    fn thread_id(&self) -> Option<String>;
    fn checkpoint_id(&self) -> Option<String>;
    fn resume_values(&self) -> Vec<Value>;
}

impl CheckpointConfigExt for RunnableConfig {
    fn with_thread_id(self, thread_id: impl Into<String>) -> Self {
        self.with_configurable(config_keys::THREAD_ID, json!(thread_id.into()))
    }

    fn with_checkpoint_id(self, checkpoint_id: impl Into<String>) -> Self {
        self.with_configurable(config_keys::CHECKPOINT_ID, json!(checkpoint_id.into()))
    }

    fn with_resume_value(self, value: Value) -> Self {
        self.with_resume_values(vec![value])
    }

    fn with_resume_values(mut self, values: Vec<Value>) -> Self {
        self.scratchpad = Some(Arc::new(InterruptScratchpad::new(values)));
        self
    }

    fn without_resume_values(mut self) -> Self {
        self.scratchpad = None;
        self
    }

    fn thread_id(&self) -> Option<String> {
        self.configurable
            .get(config_keys::THREAD_ID)
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    fn checkpoint_id(&self) -> Option<String> {
        self.configurable
            .get(config_keys::CHECKPOINT_ID)
            .and_then(|v| v.as_str())
            .map(String::from)
    }

    fn resume_values(&self) -> Vec<Value> {
        self.scratchpad
            .as_ref()
            .map(|pad| pad.answers().to_vec())
            .unwrap_or_default()
    }
}
