use async_trait::async_trait;

use agentflow_core::error::Result;

use crate::types::Checkpoint;

/// Async storage backend for graph checkpoints, partitioned by thread id.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    /// Store a checkpoint, overwriting one with the same id.
    async fn put(&self, checkpoint: Checkpoint) -> Result<()>;

    /// Retrieve a specific checkpoint by thread ID and checkpoint ID.
    async fn get(&self, thread_id: &str, checkpoint_id: &str) -> Result<Option<Checkpoint>>;

    /// Retrieve the most recently written checkpoint for a thread.
    async fn get_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>>;

    /// List all checkpoints for a thread, oldest first.
    async fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>>;

    /// Remove one checkpoint. Removing a missing checkpoint is not an error.
    async fn delete(&self, thread_id: &str, checkpoint_id: &str) -> Result<()>;

    /// Delete all checkpoints for a given thread.
    async fn delete_thread(&self, thread_id: &str) -> Result<()>;
}
