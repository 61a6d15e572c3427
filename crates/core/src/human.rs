//! Human input supports.

use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::task::spawn_blocking;

use crate::function::Param;

/// A collaborator that shows a prompt to a human operator and waits for a
/// line of input.
///
/// Returning `None` means no more input will arrive (for example, stdin
/// has been closed).
#[async_trait]
pub trait HumanPrompt: Send + Sync {
    /// Shows `text` and waits for the operator's answer.
    async fn prompt(&self, text: &str) -> Option<String>;
}

/// Adapts a blocking prompt function, running it on the blocking thread
/// pool so the turn can still be abandoned while it waits.
pub struct BlockingPrompt<F> {
    prompt_fn: Arc<F>,
}

impl<F> BlockingPrompt<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    /// Wraps a blocking prompt function.
    #[inline]
    pub fn new(prompt_fn: F) -> Self {
        Self {
            prompt_fn: Arc::new(prompt_fn),
        }
    }
}

#[async_trait]
impl<F> HumanPrompt for BlockingPrompt<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    async fn prompt(&self, text: &str) -> Option<String> {
        let prompt_fn = Arc::clone(&self.prompt_fn);
        let text = text.to_owned();
        match spawn_blocking(move || prompt_fn(&text)).await {
            Ok(input) => input,
            Err(err) => {
                error!("blocking prompt failed: {err}");
                None
            }
        }
    }
}

/// Why the human input gate gave up on a parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RejectReason {
    /// The last input did not satisfy the parameter type.
    Invalid(String),
    /// No usable input was given.
    NoInput,
}

/// The human input gate could not obtain a valid value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputRejected {
    /// Number of prompts shown.
    pub attempts: u32,
    /// Why the last attempt failed.
    pub reason: RejectReason,
}

impl Display for InputRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            RejectReason::Invalid(why) => write!(
                f,
                "input rejected after {} attempt(s): {why}",
                self.attempts
            ),
            RejectReason::NoInput => {
                write!(f, "no input after {} attempt(s)", self.attempts)
            }
        }
    }
}

impl std::error::Error for InputRejected {}

/// Asks a human operator for a parameter value and validates it against
/// the declared type before accepting it.
#[derive(Clone)]
pub struct HumanInputGate {
    prompt: Arc<dyn HumanPrompt>,
}

impl HumanInputGate {
    /// Creates a gate backed by the given prompt.
    #[inline]
    pub fn new<P: HumanPrompt + 'static>(prompt: P) -> Self {
        Self {
            prompt: Arc::new(prompt),
        }
    }

    /// Creates a gate sharing an existing prompt.
    #[inline]
    pub fn from_shared(prompt: Arc<dyn HumanPrompt>) -> Self {
        Self { prompt }
    }

    /// Requests a value for `param`, re-prompting on invalid input up to
    /// `retry_limit` times.
    ///
    /// An empty answer accepts the declared default when there is one.
    pub async fn request(
        &self,
        param: &Param,
        prompt_text: &str,
        retry_limit: u32,
    ) -> Result<Value, InputRejected> {
        let text = annotate(param, prompt_text);
        let mut reason = RejectReason::NoInput;
        let mut attempts = 0;

        while attempts <= retry_limit {
            attempts += 1;
            let Some(input) = self.prompt.prompt(&text).await else {
                debug!("input closed while asking for `{}`", param.name());
                return Err(InputRejected {
                    attempts,
                    reason: RejectReason::NoInput,
                });
            };

            let input = input.trim();
            if input.is_empty() {
                if let Some(default) = param.default() {
                    return Ok(default.clone());
                }
                reason = RejectReason::NoInput;
                continue;
            }

            match param.ty().parse(input) {
                Ok(value) => return Ok(value),
                Err(why) => {
                    debug!("invalid input for `{}`: {why}", param.name());
                    reason = RejectReason::Invalid(why);
                }
            }
        }

        Err(InputRejected { attempts, reason })
    }
}

impl Debug for HumanInputGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HumanInputGate").finish_non_exhaustive()
    }
}

fn annotate(param: &Param, prompt_text: &str) -> String {
    let mut text = String::from(prompt_text);
    if !text.is_empty() {
        text.push('\n');
    }
    text.push_str(&format!("{} ({})", param.name(), param.ty()));
    if let Some(description) = param.description() {
        text.push_str(&format!(" - {description}"));
    }
    if let Some(default) = param.default() {
        text.push_str(&format!(" [default: {default}]"));
    }
    text.push_str(": ");
    text
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::function::ParamType;
    use crate::testing::ScriptedPrompt;

    #[tokio::test]
    async fn test_retry_until_valid() {
        let prompt = ScriptedPrompt::new(["abc", "5"]);
        let gate = HumanInputGate::new(prompt.clone());
        let param = Param::required("n", ParamType::Integer);

        let value = gate.request(&param, "Need n", 3).await.unwrap();
        assert_eq!(value, json!(5));
        assert_eq!(prompt.prompts().len(), 2);
        assert_eq!(prompt.prompts()[0], "Need n\nn (integer): ");
    }

    #[tokio::test]
    async fn test_rejected_after_retry_limit() {
        let prompt = ScriptedPrompt::new(["x", "y", "z", "5"]);
        let gate = HumanInputGate::new(prompt.clone());
        let param = Param::required("n", ParamType::Integer);

        let err = gate.request(&param, "", 2).await.unwrap_err();
        assert_eq!(err.attempts, 3);
        assert!(matches!(err.reason, RejectReason::Invalid(_)));
        assert_eq!(prompt.prompts().len(), 3);
    }

    #[tokio::test]
    async fn test_empty_input_uses_default() {
        let prompt = ScriptedPrompt::new([""]);
        let gate = HumanInputGate::new(prompt.clone());
        let param = Param::with_default("n", ParamType::Integer, 7);

        let value = gate.request(&param, "", 0).await.unwrap();
        assert_eq!(value, json!(7));
        assert_eq!(prompt.prompts()[0], "n (integer) [default: 7]: ");
    }

    #[tokio::test]
    async fn test_closed_input() {
        let prompt = ScriptedPrompt::new(Vec::<&str>::new());
        let gate = HumanInputGate::new(prompt);
        let param = Param::required("n", ParamType::Integer);

        let err = gate.request(&param, "", 5).await.unwrap_err();
        assert_eq!(
            err,
            InputRejected {
                attempts: 1,
                reason: RejectReason::NoInput,
            }
        );
    }

    #[tokio::test]
    async fn test_blocking_prompt() {
        let prompt = BlockingPrompt::new(|text: &str| Some(format!("{text}!")));
        assert_eq!(prompt.prompt("hi").await.as_deref(), Some("hi!"));
    }
}
