use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::message::{Message, UsageMetadata};

fn default_true() -> bool {
    true
}

/// Desired response format for structured output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResponseFormat {
    /// Free-form text (default, equivalent to omitting the field).
    Text,
    /// Force JSON output (no schema).
    JsonObject,
    /// Force JSON output conforming to a schema.
    JsonSchema {
        name: String,
        schema: serde_json::Value,
        #[serde(default = "default_true")]
        strict: bool,
    },
}

/// Options controlling a ChatModel invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallOptions {
    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Sampling temperature (0.0 - 2.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    /// Tool definitions available for the model to call.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<crate::tool::ToolDefinition>,

    /// Structured output format.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_format: Option<ResponseFormat>,
}

/// Result of a chat model generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatResult {
    /// The generated message.
    pub message: Message,

    /// Token usage metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetadata>,
}

/// Trait for hosted chat models.
///
/// Implementations handle request formatting, transport and response parsing
/// for one provider. Transport failures, authentication problems and rate
/// limiting are reported as `ModelError`s, never as panics.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Generate a response for the given messages.
    async fn generate(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResult>;

    /// Return the model name/identifier.
    fn model_name(&self) -> &str;

    /// Convenience: send a single user prompt and return the reply text.
    async fn complete(&self, prompt: &str) -> Result<String> {
        let result = self
            .generate(&[Message::user(prompt)], &CallOptions::default())
            .await?;
        Ok(result.message.content().to_string())
    }
}
