//! Model access for the generation handler and model-driven arguments.

use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use backoff::backoff::Backoff;
use functional_agent_model::{
    ModelMessage, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse,
};
use serde_json::Value;
use tracing::Instrument;

use crate::arguments::ArgumentGenerator;
use crate::conversation::ChatMessage;
use crate::function::{FunctionSpec, Param};

type SendRequestResult = Result<ModelResponse, Box<dyn ModelProviderError>>;
type BoxedSendRequestFuture =
    Pin<Box<dyn Future<Output = SendRequestResult> + Send>>;
type HandlerFn = Arc<dyn Fn(ModelRequest) -> BoxedSendRequestFuture + Send + Sync>;

/// A wrapper around a model provider that provides a type-erased interface
/// for the other modules.
///
/// Transient failures (rate limits) are retried with an exponential
/// backoff; other failures are returned immediately.
#[derive(Clone)]
pub struct ModelClient {
    handler_fn: HandlerFn,
    backoff: ExponentialBackoff,
}

impl ModelClient {
    /// Creates a client for the given provider.
    pub fn new<P: ModelProvider + 'static>(provider: P) -> Self {
        // We have to erase the type `P`, since `ModelClient` doesn't have a
        // generic parameter and we don't want it either.
        let handler_fn: HandlerFn = Arc::new(move |req| {
            let fut = provider.send_request(&req);
            Box::pin(
                async move {
                    trace!("got a request: {:?}", req);
                    fut.await.map_err(|err| {
                        Box::new(err) as Box<dyn ModelProviderError>
                    })
                }
                .instrument(trace_span!("model client req")),
            )
        });
        let backoff = ExponentialBackoff {
            initial_interval: Duration::from_millis(200),
            max_elapsed_time: Some(Duration::from_secs(20)),
            ..Default::default()
        };
        Self {
            handler_fn,
            backoff,
        }
    }

    /// Limits the total time spent retrying a single request.
    #[inline]
    pub fn with_max_retry_time(mut self, max: Duration) -> Self {
        self.backoff.max_elapsed_time = Some(max);
        self
    }

    /// Sends a request and returns the response.
    pub async fn send_request(&self, req: ModelRequest) -> SendRequestResult {
        let mut backoff = self.backoff.clone();
        backoff.reset();
        backoff::future::retry_notify(
            backoff,
            || {
                let fut = (self.handler_fn)(req.clone());
                async move {
                    fut.await.map_err(|err| {
                        if err.kind().is_transient() {
                            backoff::Error::transient(err)
                        } else {
                            backoff::Error::permanent(err)
                        }
                    })
                }
            },
            |err: Box<dyn ModelProviderError>, after: Duration| {
                warn!("model request failed ({err}), retrying in {after:?}");
            },
        )
        .await
    }
}

/// Maps the chat history onto model messages, from the point of view of
/// the agent named `agent_name`.
pub(crate) fn history_messages(
    history: &[ChatMessage],
    agent_name: &str,
) -> impl Iterator<Item = ModelMessage> {
    history.iter().map(move |msg| {
        if msg.sender() == agent_name {
            ModelMessage::Assistant(msg.content().to_owned())
        } else {
            ModelMessage::User(msg.content().to_owned())
        }
    })
}

/// Asks a model for argument values.
#[derive(Clone)]
pub struct ModelArgumentGenerator {
    client: ModelClient,
    agent_name: String,
}

impl ModelArgumentGenerator {
    /// Creates a generator; messages from `agent_name` are presented to the
    /// model as its own.
    #[inline]
    pub fn new<S: Into<String>>(client: ModelClient, agent_name: S) -> Self {
        Self {
            client,
            agent_name: agent_name.into(),
        }
    }

    fn build_request(
        &self,
        history: &[ChatMessage],
        function: &FunctionSpec,
        param: &Param,
    ) -> ModelRequest {
        let mut instructions = format!(
            "You supply arguments for the function `{}`.",
            function.name()
        );
        if !function.description().is_empty() {
            instructions.push_str(&format!(" {}", function.description()));
        }
        instructions.push_str(&format!(
            "\nIts parameters are described by this JSON schema: {}\n\
             Based on the conversation, reply with the value of `{}` \
             (type {}) as a JSON literal and nothing else.",
            function.parameter_schema(),
            param.name(),
            param.ty(),
        ));

        let mut messages = vec![ModelMessage::System(instructions)];
        messages.extend(history_messages(history, &self.agent_name));
        messages.push(ModelMessage::User(format!("Value of `{}`:", param.name())));
        ModelRequest::with_messages(messages).with_temperature(0.0)
    }
}

#[async_trait]
impl ArgumentGenerator for ModelArgumentGenerator {
    async fn generate(
        &self,
        history: &[ChatMessage],
        function: &FunctionSpec,
        param: &Param,
    ) -> Option<Value> {
        let req = self.build_request(history, function, param);
        let resp = match self.client.send_request(req).await {
            Ok(resp) => resp,
            Err(err) => {
                warn!("failed to generate `{}`: {err}", param.name());
                return None;
            }
        };

        let text = strip_code_fence(&resp.content);
        if text.is_empty() {
            return None;
        }
        // Unparsable text is handed on as a string, so the resolver can
        // count it as an invalid attempt.
        Some(
            param
                .ty()
                .parse(text)
                .unwrap_or_else(|_| Value::String(text.to_owned())),
        )
    }
}

fn strip_code_fence(text: &str) -> &str {
    let text = text.trim();
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop the language tag line, if any.
    match inner.split_once('\n') {
        Some((tag, rest)) if !tag.trim().contains(' ') => rest.trim(),
        _ => inner.trim(),
    }
}

#[cfg(test)]
mod tests {
    use functional_agent_model::ErrorKind;
    use functional_agent_test_model::{PresetResponse, TestModelProvider};
    use serde_json::json;

    use super::*;
    use crate::function::ParamType;

    #[tokio::test(start_paused = true)]
    async fn test_retry_transient_failures() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_content("ok").with_failures(2));

        let client = ModelClient::new(provider.clone());
        let resp = client
            .send_request(ModelRequest::with_messages([ModelMessage::User(
                "hi".to_owned(),
            )]))
            .await
            .unwrap();
        assert_eq!(resp.content, "ok");
        assert_eq!(provider.requests().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_give_up_after_max_retry_time() {
        let mut provider = TestModelProvider::default();
        provider.add_response(PresetResponse::with_content("ok").with_failures(0));
        provider.set_delay(Duration::from_millis(50));

        let client = ModelClient::new(provider.clone())
            .with_max_retry_time(Duration::ZERO);
        let err = client.send_request(ModelRequest::default()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RateLimitExceeded);
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_permanent_failure() {
        let provider = TestModelProvider::default();
        let client = ModelClient::new(provider.clone());
        let result = client.send_request(ModelRequest::default()).await;
        assert!(result.is_err());
        assert_eq!(provider.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_generate_argument() {
        let mut provider = TestModelProvider::default();
        provider.add_text_response("```json\n42\n```");
        provider.add_text_response("forty-two");

        let generator =
            ModelArgumentGenerator::new(ModelClient::new(provider.clone()), "bot");
        let spec = FunctionSpec::new("f", |_| Ok(Value::Null))
            .with_param(Param::required("n", ParamType::Integer));
        let history = vec![
            ChatMessage::new("user", "use 42"),
            ChatMessage::new("bot", "ok"),
        ];

        let value = generator.generate(&history, &spec, &spec.params()[0]).await;
        assert_eq!(value, Some(json!(42)));
        let value = generator.generate(&history, &spec, &spec.params()[0]).await;
        assert_eq!(value, Some(json!("forty-two")));

        let messages = &provider.requests()[0].messages;
        assert!(matches!(messages[0], ModelMessage::System(_)));
        assert_eq!(messages[1], ModelMessage::User("use 42".to_owned()));
        assert_eq!(messages[2], ModelMessage::Assistant("ok".to_owned()));
        assert_eq!(messages[3], ModelMessage::User("Value of `n`:".to_owned()));
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence(" 5 "), "5");
        assert_eq!(strip_code_fence("```\n5\n```"), "5");
        assert_eq!(strip_code_fence("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }
}
