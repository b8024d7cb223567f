//! Workflow patterns over the agentflow graph executor.
//!
//! Each pattern module exposes a `build_*` function returning a compiled
//! graph driven by any [`ChatModel`](agentflow_core::model::ChatModel).

pub mod augmented;
pub mod chatbot;
pub mod evaluator;
pub mod messages;
pub mod node;
pub mod orchestrator;
pub mod parallel;
pub mod prompt_chain;
pub mod routing;
pub mod tool_calling;
pub mod tools;

pub mod prelude {
    pub use crate::augmented::{SearchQuery, request_tool_calls, search_query};
    pub use crate::chatbot::{ChatSession, build_chatbot};
    pub use crate::evaluator::{EvaluatorOptions, Feedback, Grade, build_evaluator_optimizer};
    pub use crate::orchestrator::{Section, Sections, build_orchestrator_worker};
    pub use crate::parallel::build_parallel;
    pub use crate::prompt_chain::build_prompt_chain;
    pub use crate::routing::{Route, RouteStep, build_router};
    pub use crate::tool_calling::{ToolCallingOptions, create_tool_calling_agent};
    pub use crate::tools::{AddTool, DivideTool, HumanAssistanceTool, MultiplyTool, WebSearchTool};
}
