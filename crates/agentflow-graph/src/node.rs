use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use agentflow_core::config::RunnableConfig;
use agentflow_core::error::Result;
use serde_json::Value;

type AsyncNodeFn =
    dyn Fn(Value, RunnableConfig) -> Pin<Box<dyn Future<Output = Result<Value>> + Send>>
        + Send
        + Sync;

/// A graph node wrapping an async function from state to a partial update.
///
/// The function receives the full state and returns an object holding only
/// the fields it wants to change (or `null` for no change).
#[derive(Clone)]
pub struct NodeFn {
    name: String,
    func: Arc<AsyncNodeFn>,
    outputs: Option<Vec<String>>,
}

impl NodeFn {
    pub fn new<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(Value, RunnableConfig) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        Self {
            name: name.into(),
            func: Arc::new(move |input, config| Box::pin(func(input, config))),
            outputs: None,
        }
    }

    /// Restrict the fields this node may write. Writing any other field
    /// fails the run.
    pub fn with_outputs<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.outputs = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declared output fields, if restricted.
    pub fn outputs(&self) -> Option<&[String]> {
        self.outputs.as_deref()
    }

    /// Whether this node may write `field`.
    pub fn writes(&self, field: &str) -> bool {
        self.outputs
            .as_ref()
            .is_none_or(|fields| fields.iter().any(|f| f == field))
    }

    pub async fn invoke(&self, state: Value, config: &RunnableConfig) -> Result<Value> {
        (self.func)(state, config.clone()).await
    }
}

impl std::fmt::Debug for NodeFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeFn")
            .field("name", &self.name)
            .field("outputs", &self.outputs)
            .finish()
    }
}
