//! Chat sessions over a shared agent.

use std::error::Error;
use std::fmt;
use std::sync::Arc;

use tokio::select;
use tokio::sync::watch;

use crate::agent::{FunctionalAgent, Reply};
use crate::conversation::ChatMessage;

/// A type of error which is returned when a session has been closed.
pub struct SessionClosedError;

impl fmt::Debug for SessionClosedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionClosedError").finish()
    }
}

impl fmt::Display for SessionClosedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        "the session has been closed".fmt(f)
    }
}

impl Error for SessionClosedError {}

/// Closes a [`ChatSession`], possibly from another task.
#[derive(Clone)]
pub struct SessionCloser(Arc<watch::Sender<bool>>);

impl SessionCloser {
    /// Closes the session. A turn in progress is abandoned.
    #[inline]
    pub fn close(&self) {
        self.0.send_replace(true);
    }
}

/// A chat session: an ordered history and an agent that replies to it.
///
/// One turn is evaluated at a time. Sessions never share mutable state, so
/// any number of them can run over the same agent concurrently.
pub struct ChatSession {
    agent: Arc<FunctionalAgent>,
    history: Vec<ChatMessage>,
    closed: Arc<watch::Sender<bool>>,
}

impl ChatSession {
    /// Creates an empty session.
    pub fn new(agent: Arc<FunctionalAgent>) -> Self {
        let (closed, _) = watch::channel(false);
        Self {
            agent,
            history: vec![],
            closed: Arc::new(closed),
        }
    }

    /// Returns the agent of this session.
    #[inline]
    pub fn agent(&self) -> &FunctionalAgent {
        &self.agent
    }

    /// Returns the messages so far.
    #[inline]
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Returns a handle that closes this session.
    #[inline]
    pub fn closer(&self) -> SessionCloser {
        SessionCloser(Arc::clone(&self.closed))
    }

    /// Returns `true` if the session has been closed.
    #[inline]
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Appends a message from `sender`.
    pub fn send<S1: Into<String>, S2: Into<String>>(
        &mut self,
        sender: S1,
        content: S2,
    ) -> Result<(), SessionClosedError> {
        if self.is_closed() {
            return Err(SessionClosedError);
        }
        self.history.push(ChatMessage::new(sender, content));
        Ok(())
    }

    /// Lets the agent reply to the last message from `sender`.
    ///
    /// The reply, if any, is appended to the history under the agent's
    /// name. If the session is closed while the turn is in progress, the
    /// turn is dropped along with any argument it was resolving.
    pub async fn run_turn(
        &mut self,
        sender: &str,
    ) -> Result<Reply, SessionClosedError> {
        let mut closed = self.closed.subscribe();
        if *closed.borrow_and_update() {
            return Err(SessionClosedError);
        }

        let reply = select! {
            reply = self.agent.evaluate_turn(&self.history, sender) => reply,
            _ = closed.wait_for(|closed| *closed) => {
                info!("session closed during a turn of `{}`", self.agent.name());
                return Err(SessionClosedError);
            }
        };

        if let Some(content) = &reply.content {
            self.history
                .push(ChatMessage::new(self.agent.name(), content.clone()));
        }
        Ok(reply)
    }

    /// Sends a message and runs a turn for it.
    pub async fn exchange<S1: Into<String>, S2: Into<String>>(
        &mut self,
        sender: S1,
        content: S2,
    ) -> Result<Reply, SessionClosedError> {
        let sender = sender.into();
        self.send(sender.clone(), content)?;
        self.run_turn(&sender).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use serde_json::json;
    use tokio::time::sleep;

    use super::*;
    use crate::function::{FunctionSpec, Param, ParamType};
    use crate::human::HumanInputGate;
    use crate::testing::StalledPrompt;
    use crate::{ArgumentSource, FunctionalAgentBuilder};

    fn counter_agent(calls: Arc<AtomicU32>) -> Arc<FunctionalAgent> {
        let spec = FunctionSpec::new("count", move |_| {
            Ok(json!(calls.fetch_add(1, Ordering::SeqCst) + 1))
        });
        Arc::new(
            FunctionalAgentBuilder::new("counter")
                .with_function(spec)
                .build()
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_history() {
        let calls = Arc::new(AtomicU32::new(0));
        let mut session = ChatSession::new(counter_agent(calls));

        let reply = session.exchange("user", "count!").await.unwrap();
        assert_eq!(reply.content.as_deref(), Some("1"));
        assert_eq!(
            session.history(),
            &[
                ChatMessage::new("user", "count!"),
                ChatMessage::new("counter", "1"),
            ]
        );
    }

    #[tokio::test]
    async fn test_sessions_share_agent() {
        let calls = Arc::new(AtomicU32::new(0));
        let agent = counter_agent(Arc::clone(&calls));
        let mut first = ChatSession::new(Arc::clone(&agent));
        let mut second = ChatSession::new(agent);

        let (a, b) = tokio::join!(
            first.exchange("alice", "go"),
            second.exchange("bob", "go"),
        );
        let mut contents = vec![a.unwrap().content, b.unwrap().content];
        contents.sort();
        assert_eq!(contents, vec![Some("1".to_owned()), Some("2".to_owned())]);
        assert_eq!(first.history().len(), 2);
        assert_eq!(second.history().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_abandons_pending_input() {
        let calls = Arc::new(AtomicU32::new(0));
        let spec = FunctionSpec::new("double", {
            let calls = Arc::clone(&calls);
            move |args| {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(json!(args.get_i64("n").unwrap_or_default() * 2))
            }
        })
        .with_param(Param::required("n", ParamType::Integer));
        let prompt = StalledPrompt::default();
        let agent = FunctionalAgentBuilder::new("doubler")
            .with_function(spec)
            .with_argument_source(ArgumentSource::human(HumanInputGate::new(
                prompt.clone(),
            )))
            .build()
            .unwrap();

        let mut session = ChatSession::new(Arc::new(agent));
        let closer = session.closer();
        tokio::spawn(async move {
            sleep(Duration::from_secs(1)).await;
            closer.close();
        });

        let result = session.exchange("user", "double it").await;
        assert!(result.is_err());
        assert!(session.is_closed());
        assert_eq!(prompt.asked(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(session.history().len(), 1);
        assert!(session.send("user", "anyone?").is_err());
    }
}
