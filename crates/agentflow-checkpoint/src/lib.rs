pub mod config_ext;
pub mod interrupt;
pub mod memory;
pub mod send;
pub mod store;
pub mod types;

pub mod prelude {
    pub use crate::config_ext::CheckpointConfigExt;
    pub use crate::interrupt::{config_keys, interrupt};
    pub use crate::memory::MemoryCheckpointStore;
    pub use crate::send::SendDirective;
    pub use crate::store::CheckpointStore;
    pub use crate::types::{
        Checkpoint, CheckpointMetadata, CheckpointSource, GraphOutput, PendingTask, PendingWrite,
    };
}
