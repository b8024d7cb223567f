use async_trait::async_trait;

use crate::config::RunnableConfig;
use crate::error::Result;

/// Core abstraction for an async computation unit.
///
/// Compiled graphs implement this trait so a whole workflow can be invoked
/// like any other component.
#[async_trait]
pub trait Runnable: Send + Sync {
    type Input: Send + 'static;
    type Output: Send + 'static;

    /// Process a single input and return a result.
    async fn invoke(&self, input: Self::Input, config: &RunnableConfig) -> Result<Self::Output>;

    /// Process multiple inputs concurrently, preserving input order.
    async fn batch(
        &self,
        inputs: Vec<Self::Input>,
        config: &RunnableConfig,
    ) -> Result<Vec<Self::Output>> {
        futures::future::try_join_all(inputs.into_iter().map(|input| self.invoke(input, config)))
            .await
    }
}
