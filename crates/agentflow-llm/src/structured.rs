//! Typed replies: ask the model for JSON matching a schema derived from `T`
//! and parse the reply into `T`.

use schemars::JsonSchema;
use serde::de::DeserializeOwned;

use agentflow_core::error::{ModelError, Result};
use agentflow_core::message::Message;
use agentflow_core::model::{CallOptions, ChatModel, ResponseFormat};

/// Call options requesting a JSON reply shaped like `T`.
///
/// The schema is not strict: schemars output uses keywords that strict mode
/// rejects.
pub fn structured_options<T: JsonSchema>() -> Result<CallOptions> {
    let schema = serde_json::to_value(schemars::schema_for!(T))?;
    Ok(CallOptions {
        response_format: Some(ResponseFormat::JsonSchema {
            name: T::schema_name(),
            schema,
            strict: false,
        }),
        ..Default::default()
    })
}

/// Generate a reply and parse it as `T`.
///
/// A reply that is not valid JSON for `T` is a `ModelError::InvalidResponse`.
pub async fn generate_structured<T>(model: &dyn ChatModel, messages: &[Message]) -> Result<T>
where
    T: DeserializeOwned + JsonSchema,
{
    let options = structured_options::<T>()?;
    let result = model.generate(messages, &options).await?;
    parse_structured(result.message.content())
}

/// Parse a model reply as `T`, tolerating a surrounding Markdown code fence.
pub fn parse_structured<T: DeserializeOwned>(content: &str) -> Result<T> {
    let body = strip_code_fence(content);
    serde_json::from_str(body).map_err(|e| {
        ModelError::InvalidResponse(format!("reply does not match the requested schema: {e}"))
            .into()
    })
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_core::error::FlowError;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, JsonSchema, PartialEq)]
    struct Route {
        step: String,
    }

    #[test]
    fn options_carry_schema() {
        let options = structured_options::<Route>().unwrap();
        match options.response_format {
            Some(ResponseFormat::JsonSchema {
                name,
                schema,
                strict,
            }) => {
                assert_eq!(name, "Route");
                assert!(!strict);
                assert!(schema["properties"]["step"].is_object());
            }
            other => panic!("unexpected format: {other:?}"),
        }
    }

    #[test]
    fn parses_plain_and_fenced_json() {
        let plain: Route = parse_structured(r#"{"step": "poem"}"#).unwrap();
        assert_eq!(plain.step, "poem");

        let fenced: Route = parse_structured("```json\n{\"step\": \"joke\"}\n```").unwrap();
        assert_eq!(fenced.step, "joke");
    }

    #[test]
    fn mismatched_reply_is_invalid_response() {
        let err = parse_structured::<Route>("I think a poem").unwrap_err();
        assert!(matches!(err, FlowError::Model(ModelError::InvalidResponse(_))));
    }
}
