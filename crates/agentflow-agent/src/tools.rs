//! Tools used by the demo agents: integer arithmetic, Tavily web search and
//! a human-review tool that interrupts the run.

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use agentflow_checkpoint::interrupt::interrupt;
use agentflow_core::config::RunnableConfig;
use agentflow_core::error::{Result, ToolError};
use agentflow_core::tool::{Tool, ToolDefinition, ToolOutput};

pub const TAVILY_SEARCH_URL: &str = "https://api.tavily.com/search";

fn definition<T: JsonSchema>(name: &str, description: &str) -> ToolDefinition {
    let mut parameters =
        serde_json::to_value(schemars::schema_for!(T)).unwrap_or_else(|_| json!({"type": "object"}));
    if let Some(obj) = parameters.as_object_mut() {
        obj.remove("$schema");
        obj.remove("title");
    }
    ToolDefinition {
        name: name.into(),
        description: description.into(),
        parameters,
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, input: Value) -> Result<T> {
    serde_json::from_value(input)
        .map_err(|e| ToolError::InvalidInput(format!("{tool}: {e}")).into())
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct BinaryArgs {
    /// first int
    pub a: i64,
    /// second int
    pub b: i64,
}

fn checked(tool: &str, value: Option<i64>) -> Result<String> {
    value
        .map(|v| v.to_string())
        .ok_or_else(|| ToolError::ExecutionFailed(format!("{tool}: integer overflow")).into())
}

pub struct AddTool;

#[async_trait]
impl Tool for AddTool {
    fn definition(&self) -> ToolDefinition {
        definition::<BinaryArgs>("add", "Adds a and b.")
    }

    async fn call(&self, input: Value, _config: &RunnableConfig) -> Result<String> {
        let args: BinaryArgs = parse_args("add", input)?;
        checked("add", args.a.checked_add(args.b))
    }
}

pub struct MultiplyTool;

#[async_trait]
impl Tool for MultiplyTool {
    fn definition(&self) -> ToolDefinition {
        definition::<BinaryArgs>("multiply", "Multiply a and b.")
    }

    async fn call(&self, input: Value, _config: &RunnableConfig) -> Result<String> {
        let args: BinaryArgs = parse_args("multiply", input)?;
        checked("multiply", args.a.checked_mul(args.b))
    }
}

pub struct DivideTool;

#[async_trait]
impl Tool for DivideTool {
    fn definition(&self) -> ToolDefinition {
        definition::<BinaryArgs>("divide", "Divide a and b.")
    }

    async fn call(&self, input: Value, _config: &RunnableConfig) -> Result<String> {
        let args: BinaryArgs = parse_args("divide", input)?;
        if args.b == 0 {
            return Err(ToolError::ExecutionFailed("divide: division by zero".into()).into());
        }
        Ok((args.a as f64 / args.b as f64).to_string())
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct SearchArgs {
    /// The search query.
    pub query: String,
}

#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    api_key: &'a str,
    query: &'a str,
    max_results: u32,
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub url: String,
    pub content: String,
}

/// Web search through the Tavily API, returning the top results as a JSON
/// array of `{title, url, content}`.
pub struct WebSearchTool {
    api_key: String,
    max_results: u32,
    endpoint: String,
    client: reqwest::Client,
}

impl WebSearchTool {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            max_results: 2,
            endpoint: TAVILY_SEARCH_URL.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_max_results(mut self, max_results: u32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

/// Render a Tavily response body as the tool output.
pub fn format_search_results(body: &str) -> Result<String> {
    let response: TavilyResponse = serde_json::from_str(body)
        .map_err(|e| ToolError::ExecutionFailed(format!("web_search: bad response: {e}")))?;
    Ok(serde_json::to_string(&response.results)?)
}

#[async_trait]
impl Tool for WebSearchTool {
    fn definition(&self) -> ToolDefinition {
        definition::<SearchArgs>(
            "web_search",
            "A search engine optimized for comprehensive, accurate, and trusted results. \
             Input should be a search query.",
        )
    }

    async fn call(&self, input: Value, _config: &RunnableConfig) -> Result<String> {
        let args: SearchArgs = parse_args("web_search", input)?;
        tracing::debug!(query = %args.query, "web search");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&TavilyRequest {
                api_key: &self.api_key,
                query: &args.query,
                max_results: self.max_results,
            })
            .send()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("web_search: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("web_search: {e}")))?;
        if !status.is_success() {
            return Err(
                ToolError::ExecutionFailed(format!("web_search: HTTP {status}: {body}")).into(),
            );
        }
        format_search_results(&body)
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct HumanAssistanceArgs {
    /// Name to confirm.
    pub name: String,
    /// Birthday to confirm.
    pub birthday: String,
}

/// Asks a human to confirm a name and birthday.
///
/// The first call interrupts the run with `{question, name, birthday}`. When
/// resumed, a reply whose `correct` field starts with `y` confirms the
/// values; anything else is reported as a correction. Either way the
/// verified `name` and `birthday` are written to state.
pub struct HumanAssistanceTool;

/// Verified values after a human review.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewOutcome {
    pub name: String,
    pub birthday: String,
    /// Text of the tool message.
    pub response: String,
}

/// Apply a reviewer's reply to the values under review. Corrected fields
/// missing from the reply keep the proposed value.
pub fn review_outcome(args: &HumanAssistanceArgs, reply: &Value) -> ReviewOutcome {
    let confirmed = reply
        .get("correct")
        .and_then(Value::as_str)
        .is_some_and(|c| c.to_lowercase().starts_with('y'));
    if confirmed {
        return ReviewOutcome {
            name: args.name.clone(),
            birthday: args.birthday.clone(),
            response: "Correct".to_string(),
        };
    }
    let field = |key: &str, proposed: &str| {
        reply
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(proposed)
            .to_string()
    };
    ReviewOutcome {
        name: field("name", &args.name),
        birthday: field("birthday", &args.birthday),
        response: format!("Made a correction: {reply}"),
    }
}

#[async_trait]
impl Tool for HumanAssistanceTool {
    fn definition(&self) -> ToolDefinition {
        definition::<HumanAssistanceArgs>("human_assistance", "Request assistance from a human.")
    }

    async fn call(&self, input: Value, config: &RunnableConfig) -> Result<String> {
        Ok(self.run(input, config).await?.content)
    }

    fn state_fields(&self) -> Vec<String> {
        vec!["name".into(), "birthday".into()]
    }

    async fn run(&self, input: Value, config: &RunnableConfig) -> Result<ToolOutput> {
        let args: HumanAssistanceArgs = parse_args("human_assistance", input)?;
        let reply = interrupt(
            config,
            json!({
                "question": "Is this correct?",
                "name": &args.name,
                "birthday": &args.birthday,
            }),
        )?;
        let outcome = review_outcome(&args, &reply);
        Ok(ToolOutput::text(outcome.response)
            .with_update("name", json!(outcome.name))
            .with_update("birthday", json!(outcome.birthday)))
    }
}
