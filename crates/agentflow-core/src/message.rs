use std::fmt;

use serde::{Deserialize, Serialize};

/// Metadata about token usage from a model call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageMetadata {
    pub input_tokens: u64,
    pub output_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

/// A request from the model to call a tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

/// Content of an AI message, which may include tool call requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AIContent {
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageMetadata>,
}

/// A chat message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },

    #[serde(rename = "user")]
    User { content: String },

    #[serde(rename = "ai")]
    AI(AIContent),

    #[serde(rename = "tool")]
    Tool {
        content: String,
        tool_call_id: String,
    },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User {
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Message::AI(AIContent {
            content: content.into(),
            tool_calls: Vec::new(),
            usage: None,
        })
    }

    pub fn ai_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Message::AI(AIContent {
            content: content.into(),
            tool_calls,
            usage: None,
        })
    }

    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Message::Tool {
            content: content.into(),
            tool_call_id: tool_call_id.into(),
        }
    }

    /// Extract the text content from any message variant.
    pub fn content(&self) -> &str {
        match self {
            Message::System { content } => content,
            Message::User { content } => content,
            Message::AI(ai) => &ai.content,
            Message::Tool { content, .. } => content,
        }
    }

    /// Tool calls requested by this message (empty for non-AI messages).
    pub fn tool_calls(&self) -> &[ToolCall] {
        match self {
            Message::AI(ai) => &ai.tool_calls,
            _ => &[],
        }
    }

    fn role_title(&self) -> &'static str {
        match self {
            Message::System { .. } => "System Message",
            Message::User { .. } => "Human Message",
            Message::AI(_) => "Ai Message",
            Message::Tool { .. } => "Tool Message",
        }
    }
}

/// Banner-style rendering used by the demo binaries.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = format!(" {} ", self.role_title());
        writeln!(f, "{title:=^80}")?;
        if let Message::Tool { tool_call_id, .. } = self {
            writeln!(f, "Tool call id: {tool_call_id}")?;
        }
        let content = self.content();
        if !content.is_empty() {
            writeln!(f)?;
            writeln!(f, "{content}")?;
        }
        let calls = self.tool_calls();
        if !calls.is_empty() {
            writeln!(f, "Tool Calls:")?;
            for call in calls {
                writeln!(f, "  {} ({})", call.name, call.id)?;
                writeln!(f, "    Args: {}", call.arguments)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ai_message_with_tool_calls_serde_roundtrip() {
        let msg = Message::ai_with_tool_calls(
            "",
            vec![ToolCall {
                id: "call_1".into(),
                name: "add".into(),
                arguments: serde_json::json!({"a": 3, "b": 4}),
            }],
        );
        let json = serde_json::to_string(&msg).unwrap();
        let deserialized: Message = serde_json::from_str(&json).unwrap();
        assert_eq!(msg, deserialized);
        assert!(json.contains(r#""type":"ai""#));
    }

    #[test]
    fn empty_ai_content_omits_optional_fields() {
        let json = serde_json::to_string(&Message::ai("")).unwrap();
        assert!(!json.contains("tool_calls"));
        assert!(!json.contains("usage"));
    }

    #[test]
    fn content_and_tool_call_accessors() {
        assert_eq!(Message::system("sys").content(), "sys");
        assert_eq!(Message::user("usr").content(), "usr");
        assert_eq!(Message::tool("7", "id").content(), "7");
        assert!(Message::user("usr").tool_calls().is_empty());
    }

    #[test]
    fn deserialize_from_json_string() {
        let msg: Message = serde_json::from_str(r#"{"type":"user","content":"Add 3 and 4."}"#).unwrap();
        assert_eq!(msg, Message::user("Add 3 and 4."));
    }

    #[test]
    fn display_shows_role_banner_and_tool_calls() {
        let msg = Message::ai_with_tool_calls(
            "",
            vec![ToolCall {
                id: "call_1".into(),
                name: "add".into(),
                arguments: serde_json::json!({"a": 3, "b": 4}),
            }],
        );
        let rendered = msg.to_string();
        assert!(rendered.contains(" Ai Message "));
        assert!(rendered.contains("add (call_1)"));

        let rendered = Message::tool("7", "call_1").to_string();
        assert!(rendered.contains("Tool call id: call_1"));
        assert!(rendered.contains('7'));
    }
}
