//! Function invocation and the records it produces.

use serde_json::Value;

use crate::agent::HandlerId;
use crate::function::{Arguments, FunctionError, FunctionSpec};

/// What to do when the registered function fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ErrorMode {
    /// The error summary becomes the turn's reply.
    #[default]
    FailHard,
    /// The handler falls through to the next one.
    FailSoft,
}

/// One call of the registered function: its input and its outcome.
#[derive(Clone, Debug, PartialEq)]
pub struct Invocation {
    /// Name of the function that was called.
    pub function: String,
    /// Arguments the function was called with.
    pub arguments: Arguments,
    /// Return value, or the error it failed with.
    pub outcome: Result<Value, FunctionError>,
}

impl Invocation {
    /// Returns a one-line description of the call.
    pub fn summary(&self) -> String {
        match &self.outcome {
            Ok(_) => format!(
                "`{}` executed with {} argument(s)",
                self.function,
                self.arguments.len()
            ),
            Err(err) => format!("`{}` failed: {err}", self.function),
        }
    }
}

/// The result of evaluating one handler.
#[derive(Clone, Debug, PartialEq)]
pub struct TurnRecord {
    /// The handler that produced this record.
    pub handler: HandlerId,
    /// Whether the handler claims the turn.
    pub is_final: bool,
    /// The content visible to the rest of the chat.
    pub content: Option<String>,
    /// The raw function call, for records of the function handler.
    pub invocation: Option<Invocation>,
}

impl TurnRecord {
    /// A record that leaves the turn to the next handler.
    #[inline]
    pub fn fall_through(handler: HandlerId) -> Self {
        Self {
            handler,
            is_final: false,
            content: None,
            invocation: None,
        }
    }

    /// A record that claims the turn.
    #[inline]
    pub fn claim(handler: HandlerId, content: Option<String>) -> Self {
        Self {
            handler,
            is_final: true,
            content,
            invocation: None,
        }
    }
}

/// Calls the registered function and turns its outcome into a record.
#[derive(Clone, Copy, Debug, Default)]
pub struct FunctionInvoker {
    error_mode: ErrorMode,
}

impl FunctionInvoker {
    /// Creates an invoker with the given error mode.
    #[inline]
    pub fn new(error_mode: ErrorMode) -> Self {
        Self { error_mode }
    }

    /// Calls `spec` exactly once with `arguments`.
    ///
    /// A successful record is final and has no content yet; the visible
    /// content is decided by the visibility filter. A failed record carries
    /// the error summary in fail-hard mode and falls through in fail-soft
    /// mode.
    pub fn invoke(&self, spec: &FunctionSpec, arguments: Arguments) -> TurnRecord {
        let span = debug_span!("function invoke", function = spec.name());
        let _enter = span.enter();

        trace!("calling with ({arguments})");
        let outcome = spec.call(&arguments);
        let invocation = Invocation {
            function: spec.name().to_owned(),
            arguments,
            outcome,
        };

        let (is_final, content) = match (&invocation.outcome, self.error_mode) {
            (Ok(_), _) => (true, None),
            (Err(err), ErrorMode::FailHard) => {
                warn!("function failed: {err}");
                (true, Some(format!("Error: {}", invocation.summary())))
            }
            (Err(err), ErrorMode::FailSoft) => {
                warn!("function failed, falling through: {err}");
                (false, None)
            }
        };

        TurnRecord {
            handler: HandlerId::Function,
            is_final,
            content,
            invocation: Some(invocation),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use serde_json::json;

    use super::*;

    #[test]
    fn test_invoke_once() {
        let calls = Arc::new(AtomicU32::new(0));
        let spec = FunctionSpec::new("count", {
            let calls = Arc::clone(&calls);
            move |_| Ok(json!(calls.fetch_add(1, Ordering::SeqCst) + 1))
        });

        let record =
            FunctionInvoker::default().invoke(&spec, Arguments::default());
        assert!(record.is_final);
        assert_eq!(record.content, None);
        assert_eq!(record.invocation.unwrap().outcome, Ok(json!(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_error_modes() {
        let spec = FunctionSpec::new("divide", |_| {
            Err(FunctionError::new("division by zero"))
        });

        let record = FunctionInvoker::new(ErrorMode::FailHard)
            .invoke(&spec, Arguments::default());
        assert!(record.is_final);
        assert_eq!(
            record.content.as_deref(),
            Some("Error: `divide` failed: division by zero")
        );

        let record = FunctionInvoker::new(ErrorMode::FailSoft)
            .invoke(&spec, Arguments::default());
        assert!(!record.is_final);
        assert_eq!(record.content, None);
        assert!(record.invocation.unwrap().outcome.is_err());
    }
}
