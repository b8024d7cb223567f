//! Conversions between the `messages` state field and typed [`Message`]s.

use agentflow_core::error::{FlowError, Result};
use agentflow_core::message::{Message, ToolCall};
use serde_json::Value;

/// Parse messages from a JSON array value. `null` is an empty history.
pub fn parse_messages(value: &Value) -> Result<Vec<Message>> {
    match value {
        Value::Array(arr) => arr
            .iter()
            .map(|item| serde_json::from_value(item.clone()).map_err(FlowError::from))
            .collect(),
        Value::Null => Ok(Vec::new()),
        _ => Err(FlowError::Other(
            "Expected messages to be a JSON array".into(),
        )),
    }
}

pub fn message_value(message: &Message) -> Result<Value> {
    Ok(serde_json::to_value(message)?)
}

/// Tool calls requested by the last message, if it is an AI message.
pub fn last_tool_calls(messages: &[Message]) -> Vec<ToolCall> {
    messages
        .last()
        .map(|msg| msg.tool_calls().to_vec())
        .unwrap_or_default()
}

/// Check if the last message in `state.messages` requests tools, without
/// parsing the whole history.
pub fn last_message_has_tool_calls(state: &Value) -> bool {
    let Some(last) = state
        .get("messages")
        .and_then(Value::as_array)
        .and_then(|arr| arr.last())
    else {
        return false;
    };
    matches!(last.get("tool_calls"), Some(Value::Array(arr)) if !arr.is_empty())
}

/// String field of the state, empty when absent.
pub fn state_str<'a>(state: &'a Value, field: &str) -> &'a str {
    state.get(field).and_then(Value::as_str).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_messages_from_array() {
        let val = json!([
            {"type": "user", "content": "hello"},
            {"type": "ai", "content": "hi"}
        ]);
        let msgs = parse_messages(&val).unwrap();
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].content(), "hello");
        assert_eq!(msgs[1].content(), "hi");
    }

    #[test]
    fn parse_messages_null_and_invalid() {
        assert!(parse_messages(&Value::Null).unwrap().is_empty());
        assert!(parse_messages(&json!("nope")).is_err());
        assert!(parse_messages(&json!([{"type": "alien"}])).is_err());
    }

    #[test]
    fn last_tool_calls_only_from_final_message() {
        let call = ToolCall {
            id: "call_1".into(),
            name: "add".into(),
            arguments: json!({"a": 3, "b": 4}),
        };
        let messages = vec![Message::user("hi"), Message::ai_with_tool_calls("", vec![call])];
        assert_eq!(last_tool_calls(&messages)[0].name, "add");

        let messages = vec![Message::user("hi"), Message::ai("hello")];
        assert!(last_tool_calls(&messages).is_empty());
    }

    #[test]
    fn detects_tool_calls_in_state() {
        let state = json!({"messages": [
            {"type": "user", "content": "hi"},
            {"type": "ai", "content": "", "tool_calls": [{"id": "1", "name": "add", "arguments": {}}]}
        ]});
        assert!(last_message_has_tool_calls(&state));
        assert!(!last_message_has_tool_calls(&json!({"messages": []})));
        assert!(!last_message_has_tool_calls(&json!({})));
    }

    #[test]
    fn state_str_defaults_to_empty() {
        let state = json!({"topic": "cats", "n": 1});
        assert_eq!(state_str(&state, "topic"), "cats");
        assert_eq!(state_str(&state, "n"), "");
        assert_eq!(state_str(&state, "missing"), "");
    }
}
