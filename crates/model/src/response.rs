use serde::{Deserialize, Serialize};

/// The reason why a model response has finished.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
pub enum ModelFinishReason {
    /// The model has finished generating text.
    #[default]
    Stop,
    /// The output hit the length limit.
    Length,
}

/// A completely received response from the model provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModelResponse {
    /// The generated text.
    pub content: String,
    /// The reason the model finished generating.
    pub finish_reason: ModelFinishReason,
}

impl ModelResponse {
    /// Creates a response that stopped normally.
    #[inline]
    pub fn stop<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            finish_reason: ModelFinishReason::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let resp = ModelResponse::stop("42");
        let serialized = serde_json::to_string(&resp).unwrap();
        let deserialized: ModelResponse =
            serde_json::from_str(&serialized).unwrap();
        assert_eq!(resp, deserialized);
        assert_eq!(deserialized.finish_reason, ModelFinishReason::Stop);
    }
}
