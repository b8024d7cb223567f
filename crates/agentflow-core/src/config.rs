use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Default cap on the number of super-steps in a single graph run.
pub const DEFAULT_RECURSION_LIMIT: usize = 25;

/// Configuration passed to every graph run and node invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunnableConfig {
    /// Maximum number of super-steps a graph run may take.
    pub recursion_limit: usize,

    /// Unique identifier for this run.
    pub run_id: Uuid,

    /// Arbitrary configurable values (thread id, resume value, ...).
    #[serde(default)]
    pub configurable: HashMap<String, serde_json::Value>,

    /// Resume answers for the task this config was handed to. Set by the
    /// graph executor, shared by clones, never serialized.
    #[serde(skip)]
    pub scratchpad: Option<Arc<InterruptScratchpad>>,
}

/// Resume answers of one task, handed out to its `interrupt` calls in call
/// order. Call `n` gets answer `n`; a call past the last answer suspends.
#[derive(Debug, Default)]
pub struct InterruptScratchpad {
    answers: Vec<Value>,
    next: AtomicUsize,
}

impl InterruptScratchpad {
    pub fn new(answers: Vec<Value>) -> Self {
        Self {
            answers,
            next: AtomicUsize::new(0),
        }
    }

    /// The answer for the next `interrupt` call, if one was given.
    pub fn next_answer(&self) -> Option<Value> {
        let index = self.next.fetch_add(1, Ordering::SeqCst);
        self.answers.get(index).cloned()
    }

    pub fn answers(&self) -> &[Value] {
        &self.answers
    }
}

impl Default for RunnableConfig {
    fn default() -> Self {
        Self {
            recursion_limit: DEFAULT_RECURSION_LIMIT,
            run_id: Uuid::new_v4(),
            configurable: HashMap::new(),
            scratchpad: None,
        }
    }
}

impl RunnableConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    pub fn with_run_id(mut self, run_id: Uuid) -> Self {
        self.run_id = run_id;
        self
    }

    pub fn with_configurable(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.configurable.insert(key.into(), value);
        self
    }

    /// Remove a configurable value, returning the config.
    pub fn without_configurable(mut self, key: &str) -> Self {
        self.configurable.remove(key);
        self
    }
}
