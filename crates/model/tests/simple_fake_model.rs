use std::error::Error;
use std::fmt::{self, Display, Formatter};
use std::time::Duration;

use functional_agent_model::{
    ErrorKind, ModelMessage, ModelProvider, ModelProviderError, ModelRequest,
    ModelResponse,
};
use tokio::time::sleep;

#[derive(Debug)]
struct FakeModelProviderError(ErrorKind);

impl Display for FakeModelProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

impl Error for FakeModelProviderError {}

impl ModelProviderError for FakeModelProviderError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Echoes the last user message back.
struct FakeModelProvider;

impl ModelProvider for FakeModelProvider {
    type Error = FakeModelProviderError;

    fn send_request(
        &self,
        req: &ModelRequest,
    ) -> impl Future<Output = Result<ModelResponse, Self::Error>> + Send + 'static
    {
        let last_user = req
            .messages
            .iter()
            .rev()
            .find(|msg| matches!(msg, ModelMessage::User(_)))
            .map(|msg| msg.text().to_owned());
        async move {
            sleep(Duration::from_millis(1)).await;
            let Some(text) = last_user else {
                return Err(FakeModelProviderError(ErrorKind::Other));
            };
            Ok(ModelResponse::stop(format!("You said {text}")))
        }
    }
}

#[tokio::test]
async fn test_completion() {
    let provider = FakeModelProvider;
    let req = ModelRequest::with_messages([
        ModelMessage::System("Be nice.".to_owned()),
        ModelMessage::User("Good morning".to_owned()),
    ]);
    let resp = provider.send_request(&req).await.unwrap();
    assert_eq!(resp.content, "You said Good morning");
}

#[tokio::test]
async fn test_error() {
    let provider = FakeModelProvider;
    let req = ModelRequest::default();
    let err = provider.send_request(&req).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Other);
    assert!(!err.kind().is_transient());
}
