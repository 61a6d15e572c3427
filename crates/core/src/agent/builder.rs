use std::sync::Arc;

use functional_agent_model::ModelProvider;
use serde_json::Value;

use super::FunctionalAgent;
use super::handler::{
    CodeExecutor, FunctionHandler, GenerationHandler, Handler, HandlerChain,
    HumanReplyHandler, HumanReplyMode, TerminationPredicate,
};
use crate::arguments::{ArgumentResolver, ArgumentSource, DefaultPolicy};
use crate::error::ConfigurationError;
use crate::function::FunctionSpec;
use crate::human::HumanPrompt;
use crate::invoker::{ErrorMode, FunctionInvoker};
use crate::model_client::ModelClient;
use crate::visibility::VisibilityConfig;

const DEFAULT_RETRY_LIMIT: u32 = 3;

/// [`FunctionalAgent`] builder.
///
/// The inherited handlers are chained as termination/human reply, code
/// execution (if an executor is set), then generation (if a model is set).
/// The function handler is inserted at the insertion index, which defaults
/// to right after the termination check.
pub struct FunctionalAgentBuilder {
    name: String,
    system_message: Option<String>,
    function: Option<Arc<FunctionSpec>>,
    model_client: Option<ModelClient>,
    code_executor: Option<Arc<dyn CodeExecutor>>,
    human_reply: HumanReplyHandler,
    is_termination_msg: TerminationPredicate,
    insertion_index: usize,
    visibility: VisibilityConfig,
    argument_source: ArgumentSource,
    default_policy: DefaultPolicy,
    presets: Vec<(String, Value)>,
    retry_limit: u32,
    error_mode: ErrorMode,
    contributes_to_termination: bool,
}

impl FunctionalAgentBuilder {
    /// Creates a new builder for an agent named `name`.
    pub fn new<S: Into<String>>(name: S) -> Self {
        Self {
            name: name.into(),
            system_message: None,
            function: None,
            model_client: None,
            code_executor: None,
            human_reply: HumanReplyHandler::never(),
            is_termination_msg: Arc::new(|content: &str| {
                content.trim_end().ends_with("TERMINATE")
            }),
            insertion_index: 1,
            visibility: VisibilityConfig::default(),
            argument_source: ArgumentSource::Defaults,
            default_policy: DefaultPolicy::default(),
            presets: vec![],
            retry_limit: DEFAULT_RETRY_LIMIT,
            error_mode: ErrorMode::default(),
            contributes_to_termination: false,
        }
    }

    /// Sets the function to execute.
    #[inline]
    pub fn with_function(self, function: FunctionSpec) -> Self {
        self.with_shared_function(Arc::new(function))
    }

    /// Sets a function shared with other agents.
    #[inline]
    pub fn with_shared_function(mut self, function: Arc<FunctionSpec>) -> Self {
        self.function = Some(function);
        self
    }

    /// Sets the system message for the generation handler.
    #[inline]
    pub fn with_system_message<S: Into<String>>(mut self, message: S) -> Self {
        self.system_message = Some(message.into());
        self
    }

    /// Enables the generation handler with the specified model provider.
    #[inline]
    pub fn with_model_provider<P: ModelProvider + 'static>(
        self,
        provider: P,
    ) -> Self {
        self.with_model_client(ModelClient::new(provider))
    }

    /// Enables the generation handler with an existing model client.
    #[inline]
    pub fn with_model_client(mut self, client: ModelClient) -> Self {
        self.model_client = Some(client);
        self
    }

    /// Enables the code execution handler.
    #[inline]
    pub fn with_code_executor<E: CodeExecutor + 'static>(
        mut self,
        executor: E,
    ) -> Self {
        self.code_executor = Some(Arc::new(executor));
        self
    }

    /// Lets a human reply through `prompt` according to `mode`.
    #[inline]
    pub fn with_human_reply(
        mut self,
        mode: HumanReplyMode,
        prompt: Arc<dyn HumanPrompt>,
    ) -> Self {
        self.human_reply = HumanReplyHandler::new(mode, prompt);
        self
    }

    /// Sets the predicate deciding whether a message ends the chat.
    #[inline]
    pub fn with_termination_predicate(
        mut self,
        predicate: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_termination_msg = Arc::new(predicate);
        self
    }

    /// Sets where the function handler goes among the inherited handlers.
    /// Indices past the end append it.
    #[inline]
    pub fn with_insertion_index(mut self, index: usize) -> Self {
        self.insertion_index = index;
        self
    }

    /// Sets what part of a function call is visible in the chat.
    #[inline]
    pub fn with_visibility(mut self, visibility: VisibilityConfig) -> Self {
        self.visibility = visibility;
        self
    }

    /// Sets where unbound arguments come from.
    #[inline]
    pub fn with_argument_source(mut self, source: ArgumentSource) -> Self {
        self.argument_source = source;
        self
    }

    /// Sets whether defaults are bound before asking the source.
    #[inline]
    pub fn with_default_policy(mut self, policy: DefaultPolicy) -> Self {
        self.default_policy = policy;
        self
    }

    /// Binds an argument for every call.
    #[inline]
    pub fn with_preset_argument<S: Into<String>, V: Into<Value>>(
        mut self,
        name: S,
        value: V,
    ) -> Self {
        self.presets.push((name.into(), value.into()));
        self
    }

    /// Sets how many times a source is asked again after an unusable value.
    #[inline]
    pub fn with_retry_limit(mut self, retry_limit: u32) -> Self {
        self.retry_limit = retry_limit;
        self
    }

    /// Sets what a function error does to the turn.
    #[inline]
    pub fn with_error_mode(mut self, error_mode: ErrorMode) -> Self {
        self.error_mode = error_mode;
        self
    }

    /// Checks function output against the termination predicate; a match
    /// ends the chat instead of being posted.
    #[inline]
    pub fn contributes_to_termination(mut self, enabled: bool) -> Self {
        self.contributes_to_termination = enabled;
        self
    }

    /// Builds the agent.
    pub fn build(self) -> Result<FunctionalAgent, ConfigurationError> {
        let Some(spec) = self.function else {
            return Err(ConfigurationError::NoFunctionProvided);
        };
        if let Some(name) = spec.duplicate_param() {
            return Err(ConfigurationError::DuplicateParameter(name.to_owned()));
        }
        if let Some((name, _)) =
            self.presets.iter().find(|(name, _)| spec.param(name).is_none())
        {
            return Err(ConfigurationError::UnknownParameter(name.clone()));
        }
        if self.visibility.is_empty() {
            return Err(ConfigurationError::EmptyVisibility);
        }

        let mut chain = HandlerChain::default();
        chain.register(Handler::TerminationAndHumanReply(self.human_reply));
        if let Some(executor) = self.code_executor {
            chain.register(Handler::CodeExecution(executor));
        }
        if let Some(client) = self.model_client {
            chain.register(Handler::Generation(GenerationHandler::new(
                client,
                self.system_message,
            )));
        }

        let function_name = spec.name().to_owned();
        let function_handler = FunctionHandler {
            spec,
            presets: self.presets,
            resolver: ArgumentResolver::new(
                self.argument_source,
                self.default_policy,
                self.retry_limit,
            ),
            invoker: FunctionInvoker::new(self.error_mode),
            visibility: self.visibility,
            contributes_to_termination: self.contributes_to_termination,
        };
        let index =
            chain.insert(self.insertion_index, Handler::Function(function_handler));
        debug!(
            "agent `{}`: function `{function_name}` at {index} in {:?}",
            self.name,
            chain.ids()
        );

        Ok(FunctionalAgent {
            name: self.name,
            chain,
            is_termination_msg: self.is_termination_msg,
        })
    }
}
