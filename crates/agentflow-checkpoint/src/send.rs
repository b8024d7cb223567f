use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A directive to run a node once with a private input.
///
/// Returned by the router of a send edge; each directive becomes its own
/// task in the next super-step. The input is overlaid on the shared state
/// for that task only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendDirective {
    /// Target node name to execute.
    pub node: String,
    /// Private input visible to the target task.
    pub input: Value,
}

impl SendDirective {
    pub fn new(node: impl Into<String>, input: Value) -> Self {
        Self {
            node: node.into(),
            input,
        }
    }
}
