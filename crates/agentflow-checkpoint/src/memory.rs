use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use agentflow_core::error::{GraphError, Result};

use crate::store::CheckpointStore;
use crate::types::Checkpoint;

type Threads = HashMap<String, Vec<Checkpoint>>;

/// In-memory checkpoint store for tests and single-process demos.
///
/// All data is lost when the store is dropped.
#[derive(Default)]
pub struct MemoryCheckpointStore {
    /// thread_id -> checkpoints in insertion order
    data: RwLock<Threads>,
}

impl MemoryCheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Threads>> {
        self.data
            .read()
            .map_err(|_| GraphError::Checkpoint("checkpoint store lock poisoned".into()).into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Threads>> {
        self.data
            .write()
            .map_err(|_| GraphError::Checkpoint("checkpoint store lock poisoned".into()).into())
    }
}

#[async_trait]
impl CheckpointStore for MemoryCheckpointStore {
    async fn put(&self, checkpoint: Checkpoint) -> Result<()> {
        tracing::debug!(
            thread_id = %checkpoint.thread_id,
            checkpoint_id = %checkpoint.id,
            "storing checkpoint"
        );
        let mut data = self.write()?;
        let thread = data.entry(checkpoint.thread_id.clone()).or_default();
        match thread.iter().position(|cp| cp.id == checkpoint.id) {
            Some(pos) => thread[pos] = checkpoint,
            None => thread.push(checkpoint),
        }
        Ok(())
    }

    async fn get(&self, thread_id: &str, checkpoint_id: &str) -> Result<Option<Checkpoint>> {
        let data = self.read()?;
        Ok(data
            .get(thread_id)
            .and_then(|thread| thread.iter().find(|cp| cp.id == checkpoint_id).cloned()))
    }

    async fn get_latest(&self, thread_id: &str) -> Result<Option<Checkpoint>> {
        let data = self.read()?;
        Ok(data.get(thread_id).and_then(|thread| thread.last().cloned()))
    }

    async fn list(&self, thread_id: &str) -> Result<Vec<Checkpoint>> {
        let data = self.read()?;
        Ok(data.get(thread_id).cloned().unwrap_or_default())
    }

    async fn delete(&self, thread_id: &str, checkpoint_id: &str) -> Result<()> {
        let mut data = self.write()?;
        if let Some(thread) = data.get_mut(thread_id) {
            thread.retain(|cp| cp.id != checkpoint_id);
            if thread.is_empty() {
                data.remove(thread_id);
            }
        }
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.write()?.remove(thread_id);
        Ok(())
    }
}
