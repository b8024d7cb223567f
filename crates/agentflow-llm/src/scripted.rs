use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use agentflow_core::error::{FlowError, ModelError, Result};
use agentflow_core::message::Message;
use agentflow_core::model::{CallOptions, ChatModel, ChatResult};

type Responder = dyn Fn(&[Message], &CallOptions) -> Result<Message> + Send + Sync;

enum Script {
    Queue(Mutex<VecDeque<Result<Message>>>),
    Responder(Arc<Responder>),
}

/// A `ChatModel` that replays canned replies, for tests and offline demos.
///
/// Either pops replies from a queue in call order or computes each reply with
/// a function of the request. Every request is recorded.
pub struct ScriptedChatModel {
    name: String,
    script: Script,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedChatModel {
    pub fn new(replies: impl IntoIterator<Item = Message>) -> Self {
        Self::from_results(replies.into_iter().map(Ok).collect())
    }

    /// Queue replies that may also be errors.
    pub fn from_results(replies: Vec<Result<Message>>) -> Self {
        Self::with_script(Script::Queue(Mutex::new(replies.into())))
    }

    /// Compute each reply from the messages and options of the call.
    pub fn from_fn<F>(responder: F) -> Self
    where
        F: Fn(&[Message], &CallOptions) -> Result<Message> + Send + Sync + 'static,
    {
        Self::with_script(Script::Responder(Arc::new(responder)))
    }

    fn with_script(script: Script) -> Self {
        Self {
            name: "scripted".into(),
            script,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Messages received by each call so far, in call order.
    pub fn requests(&self) -> Vec<Vec<Message>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    fn next_reply(&self, messages: &[Message], options: &CallOptions) -> Result<Message> {
        match &self.script {
            Script::Responder(f) => f(messages, options),
            Script::Queue(queue) => queue
                .lock()
                .map_err(|_| FlowError::Other("scripted model lock poisoned".into()))?
                .pop_front()
                .unwrap_or_else(|| {
                    Err(ModelError::InvalidResponse("scripted model has no replies left".into())
                        .into())
                }),
        }
    }
}

#[async_trait]
impl ChatModel for ScriptedChatModel {
    async fn generate(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResult> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(messages.to_vec());
        }
        let message = self.next_reply(messages, options)?;
        Ok(ChatResult {
            message,
            usage: None,
        })
    }

    fn model_name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_queue_then_errors() {
        let model = ScriptedChatModel::new([Message::ai("one"), Message::ai("two")]);
        assert_eq!(model.complete("a").await.unwrap(), "one");
        assert_eq!(model.complete("b").await.unwrap(), "two");
        let err = model.complete("c").await.unwrap_err();
        assert!(matches!(err, FlowError::Model(ModelError::InvalidResponse(_))));
        assert_eq!(model.call_count(), 3);
        assert_eq!(model.requests()[1][0].content(), "b");
    }

    #[tokio::test]
    async fn responder_sees_request() {
        let model = ScriptedChatModel::from_fn(|messages, _| {
            Ok(Message::ai(messages[0].content().to_uppercase()))
        })
        .with_name("shout");
        assert_eq!(model.complete("hey").await.unwrap(), "HEY");
        assert_eq!(model.model_name(), "shout");
    }
}
