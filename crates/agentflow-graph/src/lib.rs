pub mod channel;
pub mod compiled;
pub mod constants;
pub mod edge;
pub mod node;
pub mod state_graph;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use agentflow_checkpoint::prelude::{
        CheckpointConfigExt, CheckpointStore, GraphOutput, MemoryCheckpointStore, SendDirective,
        interrupt,
    };

    pub use crate::channel::{
        AggregateOp, AppendChannel, BinaryOperatorAggregate, Channel, ChannelSpec, Channels,
        LastValue,
    };
    pub use crate::compiled::{CompiledStateGraph, StepInfo};
    pub use crate::constants::{END, START};
    pub use crate::edge::{ConditionalEdge, Edge, SendEdge};
    pub use crate::node::NodeFn;
    pub use crate::state_graph::StateGraph;
}
