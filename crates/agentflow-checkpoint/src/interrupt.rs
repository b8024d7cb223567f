use agentflow_core::config::RunnableConfig;
use agentflow_core::error::{GraphError, Result};
use serde_json::Value;

/// Config key constants for checkpoint-related configuration.
pub mod config_keys {
    pub const THREAD_ID: &str = "thread_id";
    pub const CHECKPOINT_ID: &str = "checkpoint_id";
}

/// Suspend the current task and surface `payload` to the caller.
///
/// On the first run this fails with [`GraphError::Interrupted`], which the
/// executor turns into a checkpoint. When the task is re-run by a resume,
/// its calls to `interrupt` receive the resume answers in call order: a
/// task that interrupts twice is suspended twice and needs two resumes.
///
/// ```
/// use agentflow_checkpoint::prelude::*;
/// use agentflow_core::config::RunnableConfig;
/// use serde_json::json;
///
/// let config = RunnableConfig::default();
/// let err = interrupt(&config, json!({"question": "Approve?"})).unwrap_err();
/// assert_eq!(err.interrupt_value(), Some(&json!({"question": "Approve?"})));
///
/// let config = config.with_resume_value(json!("yes"));
/// assert_eq!(interrupt(&config, json!({})).unwrap(), json!("yes"));
/// assert!(interrupt(&config, json!({"question": "Sure?"})).is_err());
/// ```
pub fn interrupt(config: &RunnableConfig, payload: Value) -> Result<Value> {
    match config.scratchpad.as_ref().and_then(|pad| pad.next_answer()) {
        Some(value) => Ok(value),
        None => Err(GraphError::Interrupted(payload).into()),
    }
}
