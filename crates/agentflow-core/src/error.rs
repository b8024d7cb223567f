use serde_json::Value;
use thiserror::Error;

/// Top-level error type for the agentflow crates.
#[derive(Debug, Error)]
pub enum FlowError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

impl FlowError {
    /// Returns the interrupt payload if this error is a graph interrupt.
    pub fn interrupt_value(&self) -> Option<&Value> {
        match self {
            FlowError::Graph(GraphError::Interrupted(value)) => Some(value),
            _ => None,
        }
    }

    /// The innermost error, looking through `GraphError::Run` wrappers.
    pub fn root(&self) -> &FlowError {
        match self {
            FlowError::Graph(GraphError::Run { source, .. }) => source.root(),
            other => other,
        }
    }

    /// The exceeded limit, whether the executor's recursion cap or a loop cap
    /// raised inside a node.
    pub fn iteration_limit(&self) -> Option<usize> {
        match self.root() {
            FlowError::Graph(GraphError::MaxIterationsExceeded { limit }) => Some(*limit),
            _ => None,
        }
    }

    /// Returns `true` for errors a caller may reasonably retry
    /// (transport failures and rate limiting).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            FlowError::Model(ModelError::ApiRequest(_) | ModelError::RateLimited { .. })
        )
    }
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("API request failed: {0}")]
    ApiRequest(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limited: retry after {retry_after_secs:?}s")]
    RateLimited { retry_after_secs: Option<u64> },
}

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
}

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Invalid graph: {0}")]
    InvalidGraph(String),

    #[error("Duplicate node name: '{0}'")]
    DuplicateNode(String),

    #[error("Unknown node '{node}' referenced as {context}")]
    UnknownNode { node: String, context: String },

    #[error("Node '{node}' is not reachable from the entry point")]
    UnreachableNode { node: String },

    #[error("Router on '{node}' returned undeclared label '{label}'")]
    Router { node: String, label: String },

    #[error("Node '{node}' returned an invalid update: {reason}")]
    InvalidUpdate { node: String, reason: String },

    /// Raised directly by the executor when a run exceeds its
    /// `recursion_limit`. Loop caps checked inside a node arrive wrapped in
    /// `Run`; use [`FlowError::iteration_limit`] to match either.
    #[error("Maximum iterations ({limit}) exceeded")]
    MaxIterationsExceeded { limit: usize },

    /// A node failed. `source` is the node's own error, which may itself be a
    /// `MaxIterationsExceeded` from a loop cap; [`FlowError::root`] looks
    /// through any nesting.
    #[error("Node error in '{node}': {source}")]
    Run {
        node: String,
        /// State at the start of the failing super-step.
        state: Value,
        source: Box<FlowError>,
    },

    #[error("Graph interrupted: {0}")]
    Interrupted(Value),

    #[error("No checkpoint found for thread '{0}'")]
    NoCheckpoint(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
