mod builder;
mod handler;

use std::fmt::{self, Debug};
use std::io;

use tracing::Instrument;

pub use builder::FunctionalAgentBuilder;
pub use handler::{
    CodeExecutor, FunctionHandler, GenerationHandler, Handler, HandlerChain,
    HandlerId, HumanReplyHandler, HumanReplyMode, TerminationPredicate,
};
use handler::TurnContext;

use crate::conversation::ChatMessage;

/// The outcome of a turn: whether a handler claimed it, and the content to
/// add to the chat.
///
/// `is_final` with no content means the conversation should end without a
/// reply. `is_final == false` means no handler claimed the turn, and the
/// chat runtime should apply its own default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Reply {
    /// Whether a handler claimed the turn.
    pub is_final: bool,
    /// The visible reply.
    pub content: Option<String>,
}

/// An agent that guarantees a registered function is executed when its
/// handler is reached.
///
/// Handlers are evaluated in chain order, and the first one claiming the
/// turn wins. The agent itself holds no per-turn state, so the same agent
/// can serve many chat sessions at once.
pub struct FunctionalAgent {
    name: String,
    chain: HandlerChain,
    is_termination_msg: TerminationPredicate,
}

impl FunctionalAgent {
    /// Returns the agent name, used as the sender of its replies.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the handler chain.
    #[inline]
    pub fn chain(&self) -> &HandlerChain {
        &self.chain
    }

    /// Returns the handler chain for reconfiguration.
    #[inline]
    pub fn chain_mut(&mut self) -> &mut HandlerChain {
        &mut self.chain
    }

    /// Evaluates one turn for a message history last extended by `sender`.
    pub async fn evaluate_turn(
        &self,
        history: &[ChatMessage],
        sender: &str,
    ) -> Reply {
        let ctx = TurnContext {
            agent_name: &self.name,
            history,
            sender,
            is_termination_msg: &self.is_termination_msg,
        };

        let span = debug_span!("evaluate turn", agent = %self.name, sender);
        async {
            for handler in self.chain.iter() {
                let record = handler
                    .evaluate(&ctx)
                    .instrument(debug_span!("handler", id = %handler.id()))
                    .await;
                trace!(
                    "{} returned final={} content={:?}",
                    record.handler, record.is_final, record.content
                );
                if record.is_final {
                    return Reply {
                        is_final: true,
                        content: record.content,
                    };
                }
            }
            debug!("no handler claimed the turn");
            Reply::default()
        }
        .instrument(span)
        .await
    }

    /// Blocking form of [`evaluate_turn`](Self::evaluate_turn), driving it
    /// on a fresh current-thread runtime.
    ///
    /// Fails if called from within an asynchronous runtime, where blocking
    /// would stall the caller's executor.
    pub fn evaluate_turn_blocking(
        &self,
        history: &[ChatMessage],
        sender: &str,
    ) -> io::Result<Reply> {
        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(io::Error::other(
                "cannot evaluate a turn blocking inside an async runtime",
            ));
        }
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(runtime.block_on(self.evaluate_turn(history, sender)))
    }
}

impl Debug for FunctionalAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionalAgent")
            .field("name", &self.name)
            .field("chain", &self.chain.ids())
            .finish_non_exhaustive()
    }
}
