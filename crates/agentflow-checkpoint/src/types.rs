use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A task scheduled in a super-step: one invocation of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingTask {
    /// Identifier unique within the run.
    pub id: String,
    /// Node to invoke.
    pub node: String,
    /// Private input overlaid on the state (send tasks only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
}

/// An update produced by a completed task that has not been merged yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWrite {
    pub task_id: String,
    pub node: String,
    pub update: Value,
}

/// A snapshot of a suspended run, taken when a node interrupts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Unique identifier for this checkpoint.
    pub id: String,
    /// Thread (conversation) identifier.
    pub thread_id: String,
    /// The checkpoint this one superseded, if the run was resumed before.
    pub parent_id: Option<String>,
    /// The super-step number that was suspended.
    pub step: usize,
    /// Snapshot of all channel values at the start of the suspended super-step.
    pub channel_values: HashMap<String, Value>,
    /// Every task of the suspended super-step, in scheduling order.
    pub pending_tasks: Vec<PendingTask>,
    /// Updates of sibling tasks that completed before the interrupt.
    #[serde(default)]
    pub pending_writes: Vec<PendingWrite>,
    /// The task that raised the interrupt.
    pub interrupted_task: String,
    /// Answers the interrupted task already received for its earlier
    /// `interrupt` calls; the next resume answer is appended to these.
    #[serde(default)]
    pub resume_values: Vec<Value>,
    /// Payload surfaced to the caller.
    pub interrupt_value: Value,
    pub metadata: CheckpointMetadata,
    pub created_at: DateTime<Utc>,
}

impl Checkpoint {
    /// The suspended task record.
    pub fn interrupted(&self) -> Option<&PendingTask> {
        self.pending_tasks
            .iter()
            .find(|t| t.id == self.interrupted_task)
    }

    /// Channel values as a state object.
    pub fn state(&self) -> Value {
        Value::Object(
            self.channel_values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }
}

/// How a checkpoint came to be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointSource {
    /// A fresh run interrupted.
    Input,
    /// A resumed run interrupted again.
    Resume,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub source: CheckpointSource,
    pub step: usize,
    /// Node of the interrupted task.
    pub node_name: Option<String>,
}

/// The outcome of a resumable graph execution.
#[derive(Debug, Clone)]
pub enum GraphOutput {
    /// Graph completed normally with final state.
    Complete(Value),
    /// Graph was interrupted by a node requesting human input.
    Interrupted {
        /// The checkpoint ID from which execution can be resumed.
        checkpoint_id: String,
        /// The value the interrupting node wants to present to the human.
        interrupt_value: Value,
        /// Graph state at the start of the suspended super-step.
        state: Value,
    },
}

impl GraphOutput {
    pub fn is_complete(&self) -> bool {
        matches!(self, GraphOutput::Complete(_))
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, GraphOutput::Interrupted { .. })
    }

    /// The interrupt payload, if any.
    pub fn interrupt_value(&self) -> Option<&Value> {
        match self {
            GraphOutput::Interrupted {
                interrupt_value, ..
            } => Some(interrupt_value),
            GraphOutput::Complete(_) => None,
        }
    }

    /// The final state, or the state at the interrupt.
    pub fn into_value(self) -> Value {
        match self {
            GraphOutput::Complete(v) => v,
            GraphOutput::Interrupted { state, .. } => state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Checkpoint {
        Checkpoint {
            id: "cp-1".into(),
            thread_id: "thread-1".into(),
            parent_id: None,
            step: 2,
            channel_values: HashMap::from([("messages".into(), json!([{"type": "user", "content": "hi"}]))]),
            pending_tasks: vec![
                PendingTask {
                    id: "t-1".into(),
                    node: "tools".into(),
                    input: None,
                },
                PendingTask {
                    id: "t-2".into(),
                    node: "worker".into(),
                    input: Some(json!({"section": "Intro"})),
                },
            ],
            pending_writes: vec![PendingWrite {
                task_id: "t-2".into(),
                node: "worker".into(),
                update: json!({"completed": ["intro"]}),
            }],
            interrupted_task: "t-1".into(),
            resume_values: vec![],
            interrupt_value: json!({"question": "ok?"}),
            metadata: CheckpointMetadata {
                source: CheckpointSource::Input,
                step: 2,
                node_name: Some("tools".into()),
            },
            created_at: Utc::now(),
        }
    }

    #[test]
    fn checkpoint_serde_roundtrip() {
        let cp = sample();
        let json = serde_json::to_string(&cp).unwrap();
        let back: Checkpoint = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, "cp-1");
        assert_eq!(back.pending_tasks, cp.pending_tasks);
        assert_eq!(back.pending_writes, cp.pending_writes);
        assert_eq!(back.metadata.source, CheckpointSource::Input);
        assert!(json.contains(r#""source":"input""#));
    }

    #[test]
    fn interrupted_task_lookup() {
        let cp = sample();
        assert_eq!(cp.interrupted().unwrap().node, "tools");
        assert_eq!(cp.state()["messages"][0]["content"], "hi");
    }

    #[test]
    fn graph_output_accessors() {
        let output = GraphOutput::Complete(json!({"result": "done"}));
        assert!(output.is_complete());
        assert!(output.interrupt_value().is_none());
        assert_eq!(output.into_value(), json!({"result": "done"}));

        let output = GraphOutput::Interrupted {
            checkpoint_id: "cp-1".into(),
            interrupt_value: json!({"question": "approve?"}),
            state: json!({"count": 5}),
        };
        assert!(output.is_interrupted());
        assert_eq!(output.interrupt_value().unwrap()["question"], "approve?");
        assert_eq!(output.into_value()["count"], 5);
    }
}
