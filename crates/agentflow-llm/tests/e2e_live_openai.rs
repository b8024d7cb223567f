//! Live tests against the OpenAI Chat Completions API.
//!
//! Requires `OPENAI_API_KEY` (and optionally `MODEL_NAME`).
//!
//! Run:
//!   cargo test -p agentflow-llm --test e2e_live_openai -- --ignored --nocapture

use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::json;

use agentflow_core::message::Message;
use agentflow_core::model::{CallOptions, ChatModel};
use agentflow_core::settings::Settings;
use agentflow_core::tool::ToolDefinition;
use agentflow_llm::openai::OpenAIChatModel;
use agentflow_llm::retry::RetryChatModel;
use agentflow_llm::structured::generate_structured;

fn live_model() -> RetryChatModel<OpenAIChatModel> {
    let settings = Settings::from_env().expect("OPENAI_API_KEY must be set for live tests");
    RetryChatModel::new(OpenAIChatModel::from_settings(&settings))
}

#[derive(Debug, Deserialize, JsonSchema)]
struct Capital {
    city: String,
}

#[tokio::test]
#[ignore]
async fn live_basic_chat() {
    let model = live_model();
    let reply = model.complete("Reply with the single word: pong").await.unwrap();
    println!("reply: {reply}");
    assert!(reply.to_lowercase().contains("pong"));
}

#[tokio::test]
#[ignore]
async fn live_tool_call() {
    let model = live_model();
    let options = CallOptions {
        tools: vec![ToolDefinition {
            name: "multiply".into(),
            description: "Multiply a and b.".into(),
            parameters: json!({
                "type": "object",
                "properties": {"a": {"type": "integer"}, "b": {"type": "integer"}},
                "required": ["a", "b"]
            }),
        }],
        ..Default::default()
    };
    let result = model
        .generate(&[Message::user("What is 2 times 3? Use the tool.")], &options)
        .await
        .unwrap();
    let calls = result.message.tool_calls();
    assert_eq!(calls[0].name, "multiply");
    assert_eq!(calls[0].arguments, json!({"a": 2, "b": 3}));
}

#[tokio::test]
#[ignore]
async fn live_structured_output() {
    let model = live_model();
    let capital: Capital = generate_structured(
        &model,
        &[Message::user("What is the capital of France?")],
    )
    .await
    .unwrap();
    assert_eq!(capital.city, "Paris");
}
