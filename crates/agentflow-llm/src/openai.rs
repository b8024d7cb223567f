//! OpenAI Chat Completions API integration.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use agentflow_core::error::{FlowError, ModelError, Result};
use agentflow_core::message::{AIContent, Message, ToolCall, UsageMetadata};
use agentflow_core::model::{CallOptions, ChatModel, ChatResult, ResponseFormat};
use agentflow_core::settings::Settings;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

// ---------------------------------------------------------------------------
// OpenAI Chat Completions API request/response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<OpenAIToolDef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<OpenAIResponseFormat>,
}

#[derive(Debug, Serialize)]
pub struct OpenAIResponseFormat {
    #[serde(rename = "type")]
    pub format_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_schema: Option<OpenAIJsonSchema>,
}

#[derive(Debug, Serialize)]
pub struct OpenAIJsonSchema {
    pub name: String,
    pub schema: serde_json::Value,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub strict: bool,
}

#[derive(Debug, Serialize)]
pub struct OpenAIToolDef {
    #[serde(rename = "type")]
    pub tool_type: String,
    pub function: OpenAIFunctionDef,
}

#[derive(Debug, Serialize)]
pub struct OpenAIFunctionDef {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<OpenAIRespToolCall>>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    pub choices: Vec<OpenAIChoice>,
    pub usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    pub message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIResponseMessage {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Option<Vec<OpenAIRespToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIRespToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: String,
    pub function: OpenAIRespFunction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIRespFunction {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIError {
    pub error: OpenAIErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct OpenAIErrorDetail {
    pub message: String,
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn plain_message(role: &str, content: &str) -> OpenAIMessage {
    OpenAIMessage {
        role: role.into(),
        content: content.to_string(),
        tool_call_id: None,
        tool_calls: None,
    }
}

pub fn message_to_openai(msg: &Message) -> OpenAIMessage {
    match msg {
        Message::System { content } => plain_message("system", content),
        Message::User { content } => plain_message("user", content),
        Message::AI(ai) => {
            let tool_calls = (!ai.tool_calls.is_empty()).then(|| {
                ai.tool_calls
                    .iter()
                    .map(|tc| OpenAIRespToolCall {
                        id: tc.id.clone(),
                        call_type: "function".into(),
                        function: OpenAIRespFunction {
                            name: tc.name.clone(),
                            arguments: tc.arguments.to_string(),
                        },
                    })
                    .collect()
            });
            OpenAIMessage {
                tool_calls,
                ..plain_message("assistant", &ai.content)
            }
        }
        Message::Tool {
            content,
            tool_call_id,
        } => OpenAIMessage {
            tool_call_id: Some(tool_call_id.clone()),
            ..plain_message("tool", content)
        },
    }
}

pub fn response_format_to_openai(format: &ResponseFormat) -> Option<OpenAIResponseFormat> {
    match format {
        ResponseFormat::Text => None,
        ResponseFormat::JsonObject => Some(OpenAIResponseFormat {
            format_type: "json_object".into(),
            json_schema: None,
        }),
        ResponseFormat::JsonSchema {
            name,
            schema,
            strict,
        } => Some(OpenAIResponseFormat {
            format_type: "json_schema".into(),
            json_schema: Some(OpenAIJsonSchema {
                name: name.clone(),
                schema: schema.clone(),
                strict: *strict,
            }),
        }),
    }
}

/// Convert a Chat Completions response body into a `ChatResult`.
///
/// Tool call arguments that are not valid JSON are kept as a JSON string so
/// the tool can report the problem.
pub fn parse_response(api_response: OpenAIResponse) -> Result<ChatResult> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| ModelError::InvalidResponse("response contained no choices".into()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(|tc| ToolCall {
            arguments: serde_json::from_str(&tc.function.arguments)
                .unwrap_or(serde_json::Value::String(tc.function.arguments)),
            id: tc.id,
            name: tc.function.name,
        })
        .collect();

    let usage = api_response.usage.map(|u| UsageMetadata {
        input_tokens: u.prompt_tokens,
        output_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(ChatResult {
        message: Message::AI(AIContent {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            usage: usage.clone(),
        }),
        usage,
    })
}

/// Map a non-success HTTP status to a `ModelError`.
pub fn status_error(status: u16, retry_after_secs: Option<u64>, body: String) -> ModelError {
    let error_msg = serde_json::from_str::<OpenAIError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    match status {
        401 => ModelError::Auth(error_msg),
        429 => ModelError::RateLimited { retry_after_secs },
        _ => ModelError::ApiRequest(format!("HTTP {status}: {error_msg}")),
    }
}

// ---------------------------------------------------------------------------
// OpenAIChatModel
// ---------------------------------------------------------------------------

pub struct OpenAIChatModel {
    api_key: String,
    model_id: String,
    base_url: String,
    client: reqwest::Client,
}

impl OpenAIChatModel {
    pub fn new(api_key: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model_id: model_id.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.openai_api_key.clone(), settings.model_name.clone())
    }

    /// Point the client at an OpenAI-compatible endpoint.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn build_request(&self, messages: &[Message], options: &CallOptions) -> OpenAIRequest {
        let tools = (!options.tools.is_empty()).then(|| {
            options
                .tools
                .iter()
                .map(|t| OpenAIToolDef {
                    tool_type: "function".into(),
                    function: OpenAIFunctionDef {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: t.parameters.clone(),
                    },
                })
                .collect()
        });

        OpenAIRequest {
            model: self.model_id.clone(),
            messages: messages.iter().map(message_to_openai).collect(),
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            tools,
            response_format: options
                .response_format
                .as_ref()
                .and_then(response_format_to_openai),
        }
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    async fn generate(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResult> {
        let request_body = self.build_request(messages, options);
        tracing::debug!(model = %self.model_id, messages = messages.len(), "chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| ModelError::ApiRequest(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok());
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read response body".into());
            return Err(FlowError::Model(status_error(status.as_u16(), retry_after, body)));
        }

        let api_response: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        parse_response(api_response)
    }

    fn model_name(&self) -> &str {
        &self.model_id
    }
}
