//! Reply dispatch for agents that must execute a specific function.
//!
//! A [`FunctionalAgent`] holds an ordered chain of reply handlers. On each
//! turn the handlers are evaluated in order until one claims the turn. The
//! function handler resolves the arguments of the registered function
//! (from presets, defaults, a model or a human), calls it once, and posts
//! the parts of the call allowed by its [`VisibilityConfig`].

#![warn(missing_docs)]
#![deny(clippy::missing_safety_doc)]

#[macro_use]
extern crate tracing;

mod agent;
pub mod arguments;
pub mod conversation;
mod error;
pub mod function;
pub mod human;
pub mod invoker;
mod model_client;
pub mod session;
#[cfg(test)]
mod testing;
pub mod visibility;

pub use agent::{
    CodeExecutor, FunctionHandler, FunctionalAgent, FunctionalAgentBuilder,
    GenerationHandler, Handler, HandlerChain, HandlerId, HumanReplyHandler,
    HumanReplyMode, Reply, TerminationPredicate,
};
pub use arguments::{
    ArgumentGenerator, ArgumentResolutionError, ArgumentResolutionErrorKind,
    ArgumentResolver, ArgumentSource, DefaultPolicy, PendingArguments,
};
pub use conversation::ChatMessage;
pub use error::ConfigurationError;
pub use function::{
    Arguments, FunctionError, FunctionErrorKind, FunctionResult, FunctionSpec,
    Param, ParamType,
};
pub use human::{BlockingPrompt, HumanInputGate, HumanPrompt, InputRejected};
pub use invoker::{ErrorMode, FunctionInvoker, Invocation, TurnRecord};
pub use model_client::{ModelArgumentGenerator, ModelClient};
pub use session::{ChatSession, SessionCloser, SessionClosedError};
pub use visibility::{ContentClass, VisibilityConfig};
