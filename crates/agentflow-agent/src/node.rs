use std::sync::Arc;

use agentflow_core::model::ChatModel;
use agentflow_graph::node::NodeFn;
use serde_json::{Map, Value};

/// A node that renders a prompt from the state, sends it to the model as a
/// single user message, and writes the reply text to `output`.
///
/// The node may write only `output`.
pub fn prompt_node<F>(
    name: &str,
    model: Arc<dyn ChatModel>,
    output: &str,
    prompt: F,
) -> NodeFn
where
    F: Fn(&Value) -> String + Send + Sync + 'static,
{
    let field = output.to_string();
    let prompt = Arc::new(prompt);
    NodeFn::new(name, move |state: Value, _config| {
        let model = model.clone();
        let prompt = prompt.clone();
        let field = field.clone();
        async move {
            let text = prompt(&state);
            let reply = model.complete(&text).await?;
            let mut update = Map::new();
            update.insert(field, Value::String(reply));
            Ok(Value::Object(update))
        }
    })
    .with_outputs([output])
}

#[cfg(test)]
mod tests {
    use super::*;
    use agentflow_core::config::RunnableConfig;
    use agentflow_core::message::Message;
    use agentflow_llm::scripted::ScriptedChatModel;
    use serde_json::json;

    #[tokio::test]
    async fn writes_reply_to_output_field() {
        let model = Arc::new(ScriptedChatModel::from_fn(|messages, _| {
            Ok(Message::ai(format!("re: {}", messages[0].content())))
        }));
        let node = prompt_node("joke", model, "joke", |state| {
            format!("Write a joke about {}", state["topic"].as_str().unwrap_or(""))
        });

        assert_eq!(node.outputs(), Some(&["joke".to_string()][..]));
        let update = node
            .invoke(json!({"topic": "cats"}), &RunnableConfig::default())
            .await
            .unwrap();
        assert_eq!(update, json!({"joke": "re: Write a joke about cats"}));
    }
}
