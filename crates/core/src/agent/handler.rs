use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use async_trait::async_trait;
use functional_agent_model::{ModelMessage, ModelRequest};
use serde_json::Value;

use crate::arguments::{ArgumentResolver, PendingArguments};
use crate::conversation::ChatMessage;
use crate::function::{Arguments, FunctionSpec};
use crate::human::HumanPrompt;
use crate::invoker::{FunctionInvoker, TurnRecord};
use crate::model_client::{ModelClient, history_messages};
use crate::visibility::VisibilityConfig;

/// Identity of a handler in the chain. A chain holds at most one handler
/// per identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlerId {
    /// Termination check and human reply.
    TerminationAndHumanReply,
    /// The registered function.
    Function,
    /// External code execution.
    CodeExecution,
    /// Free-form model generation.
    Generation,
}

impl Display for HandlerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HandlerId::TerminationAndHumanReply => {
                write!(f, "termination_and_human_reply")
            }
            HandlerId::Function => write!(f, "function"),
            HandlerId::CodeExecution => write!(f, "code_execution"),
            HandlerId::Generation => write!(f, "generation"),
        }
    }
}

/// Decides whether a message ends the conversation.
pub type TerminationPredicate = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Everything a handler sees while evaluating a turn.
pub(crate) struct TurnContext<'a> {
    pub agent_name: &'a str,
    pub history: &'a [ChatMessage],
    pub sender: &'a str,
    pub is_termination_msg: &'a TerminationPredicate,
}

impl TurnContext<'_> {
    fn last_is_termination(&self) -> bool {
        self.history
            .last()
            .is_some_and(|msg| (self.is_termination_msg)(msg.content()))
    }
}

/// When a human operator is asked to reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum HumanReplyMode {
    /// Never ask; a termination message ends the chat.
    #[default]
    Never,
    /// Ask only when a termination message arrives.
    Terminate,
    /// Ask on every turn.
    Always,
}

/// Checks for termination and optionally lets a human reply instead of
/// the agent.
#[derive(Clone)]
pub struct HumanReplyHandler {
    mode: HumanReplyMode,
    prompt: Option<Arc<dyn HumanPrompt>>,
}

impl HumanReplyHandler {
    /// A handler that never asks a human.
    #[inline]
    pub fn never() -> Self {
        Self {
            mode: HumanReplyMode::Never,
            prompt: None,
        }
    }

    /// A handler asking `prompt` according to `mode`.
    #[inline]
    pub fn new(mode: HumanReplyMode, prompt: Arc<dyn HumanPrompt>) -> Self {
        Self {
            mode,
            prompt: Some(prompt),
        }
    }

    async fn evaluate(&self, ctx: &TurnContext<'_>) -> TurnRecord {
        let id = HandlerId::TerminationAndHumanReply;
        let is_termination = ctx.last_is_termination();
        let prompt = match (&self.prompt, self.mode) {
            (Some(prompt), HumanReplyMode::Always) => prompt,
            (Some(prompt), HumanReplyMode::Terminate) if is_termination => prompt,
            _ => {
                if is_termination {
                    debug!("termination message received");
                    return TurnRecord::claim(id, None);
                }
                return TurnRecord::fall_through(id);
            }
        };

        let text = if is_termination {
            format!(
                "Please give feedback to {}. Press enter or type 'exit' to \
                 stop the conversation: ",
                ctx.sender
            )
        } else {
            format!(
                "Provide feedback to {}. Press enter to skip and use \
                 auto-reply, or type 'exit' to end the conversation: ",
                ctx.sender
            )
        };

        let Some(reply) = prompt.prompt(&text).await else {
            return TurnRecord::claim(id, None);
        };
        let reply = reply.trim();
        if reply == "exit" {
            TurnRecord::claim(id, None)
        } else if !reply.is_empty() {
            TurnRecord::claim(id, Some(reply.to_owned()))
        } else if is_termination {
            TurnRecord::claim(id, None)
        } else {
            TurnRecord::fall_through(id)
        }
    }
}

impl Debug for HumanReplyHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HumanReplyHandler")
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Runs code found in the conversation. The sandbox is provided by the
/// embedding application.
#[async_trait]
pub trait CodeExecutor: Send + Sync {
    /// Returns the execution output, `None` if there was nothing to run.
    async fn execute(
        &self,
        history: &[ChatMessage],
        sender: &str,
    ) -> Option<String>;
}

/// Replies with free-form text generated by a model.
#[derive(Clone)]
pub struct GenerationHandler {
    client: ModelClient,
    system_message: Option<String>,
}

impl GenerationHandler {
    /// Creates a handler using `client`.
    #[inline]
    pub fn new(client: ModelClient, system_message: Option<String>) -> Self {
        Self {
            client,
            system_message,
        }
    }

    async fn evaluate(&self, ctx: &TurnContext<'_>) -> TurnRecord {
        let mut messages = vec![];
        if let Some(system_message) = &self.system_message {
            messages.push(ModelMessage::System(system_message.clone()));
        }
        messages.extend(history_messages(ctx.history, ctx.agent_name));

        match self.client.send_request(ModelRequest::with_messages(messages)).await {
            Ok(resp) => TurnRecord::claim(HandlerId::Generation, Some(resp.content)),
            Err(err) => {
                warn!("generation failed: {err}");
                TurnRecord::fall_through(HandlerId::Generation)
            }
        }
    }
}

impl Debug for GenerationHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationHandler")
            .field("system_message", &self.system_message)
            .finish_non_exhaustive()
    }
}

/// Executes the registered function.
#[derive(Clone, Debug)]
pub struct FunctionHandler {
    pub(crate) spec: Arc<FunctionSpec>,
    pub(crate) presets: Vec<(String, Value)>,
    pub(crate) resolver: ArgumentResolver,
    pub(crate) invoker: FunctionInvoker,
    pub(crate) visibility: VisibilityConfig,
    pub(crate) contributes_to_termination: bool,
}

impl FunctionHandler {
    /// Returns the registered function.
    #[inline]
    pub fn spec(&self) -> &FunctionSpec {
        &self.spec
    }

    /// Returns the visibility configuration.
    #[inline]
    pub fn visibility(&self) -> VisibilityConfig {
        self.visibility
    }

    async fn evaluate(&self, ctx: &TurnContext<'_>) -> TurnRecord {
        let arguments = if self.spec.params().is_empty() {
            Arguments::default()
        } else {
            let mut pending = PendingArguments::unresolved(&self.spec);
            for (name, value) in &self.presets {
                pending.bind(name, value.clone());
            }
            match self.resolver.resolve(&self.spec, &mut pending, ctx.history).await {
                Ok(arguments) => arguments,
                Err(err) => {
                    warn!("argument resolution failed, falling through: {err}");
                    return TurnRecord::fall_through(HandlerId::Function);
                }
            }
        };

        let mut record = self.invoker.invoke(&self.spec, arguments);
        let succeeded = record
            .invocation
            .as_ref()
            .is_some_and(|invocation| invocation.outcome.is_ok());
        if succeeded {
            if let Some(invocation) = &record.invocation {
                record.content = Some(self.visibility.redact(invocation));
            }
        }

        if self.contributes_to_termination && record.is_final {
            let terminates = record
                .content
                .as_deref()
                .is_some_and(|content| (ctx.is_termination_msg)(content));
            if terminates {
                debug!("function output is a termination message");
                record.content = None;
            }
        }
        record
    }
}

/// A reply handler. The set of handlers is closed; the position of each in
/// the chain decides the order of evaluation.
#[derive(Clone)]
pub enum Handler {
    /// See [`HumanReplyHandler`].
    TerminationAndHumanReply(HumanReplyHandler),
    /// See [`FunctionHandler`].
    Function(FunctionHandler),
    /// See [`CodeExecutor`].
    CodeExecution(Arc<dyn CodeExecutor>),
    /// See [`GenerationHandler`].
    Generation(GenerationHandler),
}

impl Handler {
    /// Returns the identity of this handler.
    #[inline]
    pub fn id(&self) -> HandlerId {
        match self {
            Handler::TerminationAndHumanReply(_) => {
                HandlerId::TerminationAndHumanReply
            }
            Handler::Function(_) => HandlerId::Function,
            Handler::CodeExecution(_) => HandlerId::CodeExecution,
            Handler::Generation(_) => HandlerId::Generation,
        }
    }

    pub(crate) async fn evaluate(&self, ctx: &TurnContext<'_>) -> TurnRecord {
        match self {
            Handler::TerminationAndHumanReply(handler) => handler.evaluate(ctx).await,
            Handler::Function(handler) => handler.evaluate(ctx).await,
            Handler::CodeExecution(executor) => {
                match executor.execute(ctx.history, ctx.sender).await {
                    Some(output) => {
                        TurnRecord::claim(HandlerId::CodeExecution, Some(output))
                    }
                    None => TurnRecord::fall_through(HandlerId::CodeExecution),
                }
            }
            Handler::Generation(handler) => handler.evaluate(ctx).await,
        }
    }
}

impl Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::TerminationAndHumanReply(handler) => Debug::fmt(handler, f),
            Handler::Function(handler) => Debug::fmt(handler, f),
            Handler::CodeExecution(_) => f.write_str("CodeExecution"),
            Handler::Generation(handler) => Debug::fmt(handler, f),
        }
    }
}

/// The ordered reply handlers of an agent.
#[derive(Clone, Debug, Default)]
pub struct HandlerChain {
    handlers: Vec<Handler>,
}

impl HandlerChain {
    /// Registers a handler, replacing the slot of a handler with the same
    /// identity, or appending it otherwise.
    pub fn register(&mut self, handler: Handler) {
        match self.position(handler.id()) {
            Some(idx) => self.handlers[idx] = handler,
            None => self.handlers.push(handler),
        }
    }

    /// Inserts a handler at `index` (clamped to the chain length),
    /// removing any handler with the same identity first. Returns the
    /// index the handler ended up at.
    pub fn insert(&mut self, index: usize, handler: Handler) -> usize {
        self.remove(handler.id());
        let index = index.min(self.handlers.len());
        self.handlers.insert(index, handler);
        index
    }

    /// Removes the handler with identity `id`.
    pub fn remove(&mut self, id: HandlerId) -> Option<Handler> {
        let idx = self.position(id)?;
        Some(self.handlers.remove(idx))
    }

    /// Returns the index of the handler with identity `id`.
    #[inline]
    pub fn position(&self, id: HandlerId) -> Option<usize> {
        self.handlers.iter().position(|h| h.id() == id)
    }

    /// Returns the handler with identity `id`.
    #[inline]
    pub fn get(&self, id: HandlerId) -> Option<&Handler> {
        self.handlers.iter().find(|h| h.id() == id)
    }

    /// Returns the identities in evaluation order.
    #[inline]
    pub fn ids(&self) -> Vec<HandlerId> {
        self.handlers.iter().map(Handler::id).collect()
    }

    /// Returns the number of handlers.
    #[inline]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if the chain has no handler.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Iterates over the handlers in evaluation order.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Handler> {
        self.handlers.iter()
    }
}
