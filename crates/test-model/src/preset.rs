use serde::{Deserialize, Serialize};

/// The preset response for one request.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PresetResponse {
    /// Text of the response.
    pub content: String,
    /// If set, the request will fail in the first `failures` attempts with
    /// a rate-limit error. `Some(0)` means the request will fail infinitely.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failures: Option<u64>,
}

impl PresetResponse {
    /// Creates a `PresetResponse` with the specified content.
    #[inline]
    pub fn with_content<S: Into<String>>(content: S) -> Self {
        Self {
            content: content.into(),
            failures: None,
        }
    }

    /// Sets failure times before a successful response. `0` means the
    /// response will always be a failure.
    #[inline]
    pub fn with_failures(mut self, failures: u64) -> Self {
        self.failures = Some(failures);
        self
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_serialize_deserialize() {
        let response = PresetResponse::with_content("42").with_failures(2);
        let serialized = serde_json::to_value(&response).unwrap();
        assert_eq!(serialized, json!({ "content": "42", "failures": 2 }));

        let deserialized: PresetResponse =
            serde_json::from_value(json!({ "content": "42" })).unwrap();
        assert_eq!(deserialized, PresetResponse::with_content("42"));
    }
}
