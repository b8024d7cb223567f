pub mod openai;
pub mod retry;
pub mod scripted;
pub mod structured;

pub mod prelude {
    pub use crate::openai::OpenAIChatModel;
    pub use crate::retry::{RetryChatModel, RetryPolicy};
    pub use crate::scripted::ScriptedChatModel;
    pub use crate::structured::{generate_structured, structured_options};
}
