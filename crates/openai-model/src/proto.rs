use functional_agent_model::{
    ModelFinishReason, ModelMessage, ModelRequest, ModelResponse,
};
use serde::{Deserialize, Serialize};

use crate::OpenAIConfig;

// ------------------------------
// Types received from the server
// ------------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ChatCompletion {
    pub id: String,
    pub choices: Vec<Choice>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Deserialize)]
pub struct ResponseMessage {
    pub content: Option<String>,
}

// ------------------------
// Types sent to the server
// ------------------------

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Message {
    System { content: String },
    User { content: String },
    Assistant { content: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ChatCompletionRequest {
    model: String,
    messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    stream: bool,
}

// -----------
// Conversions
// -----------

#[inline]
pub fn create_request(
    req: &ModelRequest,
    config: &OpenAIConfig,
) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: config.model.clone(),
        messages: req.messages.iter().map(create_message).collect(),
        temperature: req.temperature.or(config.temperature),
        stream: false,
    }
}

#[inline]
fn create_message(msg: &ModelMessage) -> Message {
    match msg {
        ModelMessage::System(content) => Message::System {
            content: content.clone(),
        },
        ModelMessage::User(content) => Message::User {
            content: content.clone(),
        },
        ModelMessage::Assistant(content) => Message::Assistant {
            content: content.clone(),
        },
    }
}

/// Takes the first choice of a completion, `None` if there is nothing.
pub fn into_model_response(completion: ChatCompletion) -> Option<ModelResponse> {
    let choice = completion.choices.into_iter().next()?;
    let finish_reason = match choice.finish_reason.as_deref() {
        Some("length") => ModelFinishReason::Length,
        _ => ModelFinishReason::Stop,
    };
    Some(ModelResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::OpenAIConfigBuilder;

    #[test]
    fn test_create_request() {
        let config = OpenAIConfigBuilder::with_api_key("key")
            .with_model("test-model")
            .with_temperature(0.5)
            .build();
        let req = ModelRequest::with_messages([
            ModelMessage::System("sys".to_owned()),
            ModelMessage::User("hi".to_owned()),
            ModelMessage::Assistant("hello".to_owned()),
        ]);
        let value = serde_json::to_value(create_request(&req, &config)).unwrap();
        assert_eq!(
            value,
            json!({
                "model": "test-model",
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "hi" },
                    { "role": "assistant", "content": "hello" },
                ],
                "temperature": 0.5,
                "stream": false,
            })
        );
    }

    #[test]
    fn test_into_model_response() {
        let completion: ChatCompletion = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": "42" },
                "finish_reason": "length",
            }],
        }))
        .unwrap();
        let resp = into_model_response(completion).unwrap();
        assert_eq!(resp.content, "42");
        assert_eq!(resp.finish_reason, ModelFinishReason::Length);

        let empty: ChatCompletion =
            serde_json::from_value(json!({ "id": "x", "choices": [] }))
                .unwrap();
        assert!(into_model_response(empty).is_none());
    }
}
