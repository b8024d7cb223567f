use std::time::Duration;

use async_trait::async_trait;

use agentflow_core::error::{FlowError, ModelError, Result};
use agentflow_core::message::Message;
use agentflow_core::model::{CallOptions, ChatModel, ChatResult};

/// Backoff settings for [`RetryChatModel`].
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (0-based). A server-provided
    /// `Retry-After` wins when present.
    pub fn backoff(&self, attempt: u32, err: &FlowError) -> Duration {
        if let FlowError::Model(ModelError::RateLimited {
            retry_after_secs: Some(secs),
        }) = err
        {
            return Duration::from_secs(*secs).min(self.max_backoff);
        }
        let factor = 2u32.saturating_pow(attempt);
        self.initial_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Wraps a `ChatModel` and retries transient failures (transport errors and
/// rate limiting) with exponential backoff. Other errors pass through.
pub struct RetryChatModel<M> {
    inner: M,
    policy: RetryPolicy,
}

impl<M: ChatModel> RetryChatModel<M> {
    pub fn new(inner: M) -> Self {
        Self::with_policy(inner, RetryPolicy::default())
    }

    pub fn with_policy(inner: M, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }
}

#[async_trait]
impl<M: ChatModel> ChatModel for RetryChatModel<M> {
    async fn generate(&self, messages: &[Message], options: &CallOptions) -> Result<ChatResult> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(messages, options).await {
                Err(err) if err.is_transient() && attempt < self.policy.max_retries => {
                    let delay = self.policy.backoff(attempt, &err);
                    tracing::warn!(
                        model = self.inner.model_name(),
                        attempt = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "retrying chat model call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                other => return other,
            }
        }
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scripted::ScriptedChatModel;

    fn rate_limited() -> FlowError {
        ModelError::RateLimited {
            retry_after_secs: None,
        }
        .into()
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_retries: 10,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_secs(1),
        };
        let err = rate_limited();
        assert_eq!(policy.backoff(0, &err), Duration::from_millis(100));
        assert_eq!(policy.backoff(2, &err), Duration::from_millis(400));
        assert_eq!(policy.backoff(8, &err), Duration::from_secs(1));
        assert_eq!(policy.backoff(40, &err), Duration::from_secs(1));

        let hinted: FlowError = ModelError::RateLimited {
            retry_after_secs: Some(0),
        }
        .into();
        assert_eq!(policy.backoff(3, &hinted), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_errors() {
        let scripted = ScriptedChatModel::from_results(vec![
            Err(rate_limited()),
            Err(ModelError::ApiRequest("connection reset".into()).into()),
            Ok(Message::ai("finally")),
        ]);
        let model = RetryChatModel::new(scripted);
        let result = model
            .generate(&[Message::user("hi")], &CallOptions::default())
            .await
            .unwrap();
        assert_eq!(result.message.content(), "finally");
        assert_eq!(model.inner().call_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let scripted = ScriptedChatModel::from_results((0..5).map(|_| Err(rate_limited())).collect());
        let policy = RetryPolicy {
            max_retries: 2,
            ..Default::default()
        };
        let model = RetryChatModel::with_policy(scripted, policy);
        let err = model
            .generate(&[Message::user("hi")], &CallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Model(ModelError::RateLimited { .. })));
        assert_eq!(model.inner().call_count(), 3);
    }

    #[tokio::test]
    async fn auth_errors_are_not_retried() {
        let scripted = ScriptedChatModel::from_results(vec![
            Err(ModelError::Auth("bad key".into()).into()),
            Ok(Message::ai("unreachable")),
        ]);
        let model = RetryChatModel::new(scripted);
        let err = model
            .generate(&[Message::user("hi")], &CallOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, FlowError::Model(ModelError::Auth(_))));
        assert_eq!(model.inner().call_count(), 1);
    }
}
