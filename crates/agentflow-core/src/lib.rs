pub mod config;
pub mod error;
pub mod message;
pub mod model;
pub mod runnable;
pub mod settings;
pub mod tool;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::RunnableConfig;
    pub use crate::error::{FlowError, GraphError, ModelError, Result, ToolError};
    pub use crate::message::{AIContent, Message, ToolCall, UsageMetadata};
    pub use crate::model::{CallOptions, ChatModel, ChatResult, ResponseFormat};
    pub use crate::runnable::Runnable;
    pub use crate::settings::Settings;
    pub use crate::tool::{Tool, ToolDefinition, ToolOutput, ToolRegistry};
}
