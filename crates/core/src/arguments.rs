//! Argument resolution.
//!
//! Each time the function handler is reached, a fresh [`PendingArguments`]
//! is created on the stack, seeded with the preset bindings, and handed to
//! the [`ArgumentResolver`]. The resolver fills the remaining parameters
//! from defaults or from the configured [`ArgumentSource`], and always
//! leaves the pending set fully unresolved when it returns, so nothing
//! carries over to the next turn.

mod error;

use std::fmt::{self, Debug};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

pub use error::{
    Error as ArgumentResolutionError, ErrorKind as ArgumentResolutionErrorKind,
};

use crate::conversation::ChatMessage;
use crate::function::{Arguments, FunctionSpec, Param};
use crate::human::{HumanInputGate, RejectReason};

/// Produces candidate values for function parameters from the
/// conversation, usually by asking a language model.
///
/// Implementations must not modify the chat; the candidate is validated
/// by the resolver before it is used.
#[async_trait]
pub trait ArgumentGenerator: Send + Sync {
    /// Generates a candidate value for `param`, `None` if nothing could be
    /// produced.
    async fn generate(
        &self,
        history: &[ChatMessage],
        function: &FunctionSpec,
        param: &Param,
    ) -> Option<Value>;
}

/// Where values for unbound parameters come from.
#[derive(Clone, Default)]
pub enum ArgumentSource {
    /// Only declared defaults are used.
    #[default]
    Defaults,
    /// Values are generated from the conversation.
    Model(Arc<dyn ArgumentGenerator>),
    /// Values are asked from a human operator.
    Human(HumanInputGate),
}

impl ArgumentSource {
    /// Creates a model-driven source.
    #[inline]
    pub fn model<G: ArgumentGenerator + 'static>(generator: G) -> Self {
        Self::Model(Arc::new(generator))
    }

    /// Creates a human-driven source.
    #[inline]
    pub fn human(gate: HumanInputGate) -> Self {
        Self::Human(gate)
    }
}

impl Debug for ArgumentSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgumentSource::Defaults => f.write_str("Defaults"),
            ArgumentSource::Model(_) => f.write_str("Model"),
            ArgumentSource::Human(_) => f.write_str("Human"),
        }
    }
}

/// Whether declared defaults are bound before asking the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DefaultPolicy {
    /// Bind the default of an unbound parameter without asking.
    #[default]
    DefaultsWhenAbsent,
    /// Ask the source even if a default exists. Ignored for
    /// [`ArgumentSource::Defaults`].
    AlwaysAsk,
}

/// Per-invocation argument state: each parameter is either bound or
/// unresolved.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingArguments {
    slots: Vec<(String, Option<Value>)>,
}

impl PendingArguments {
    /// Creates an all-unresolved set for the parameters of `spec`.
    pub fn unresolved(spec: &FunctionSpec) -> Self {
        let slots = spec
            .params()
            .iter()
            .map(|p| (p.name().to_owned(), None))
            .collect();
        Self { slots }
    }

    /// Binds a value. Returns `false` if `name` is not a parameter.
    pub fn bind<S: AsRef<str>>(&mut self, name: S, value: Value) -> bool {
        let name = name.as_ref();
        match self.slots.iter_mut().find(|(n, _)| n == name) {
            Some((_, slot)) => {
                *slot = Some(value);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `name` is bound.
    #[inline]
    pub fn is_bound(&self, name: &str) -> bool {
        self.slots
            .iter()
            .any(|(n, slot)| n == name && slot.is_some())
    }

    /// Returns `true` if no parameter is bound.
    #[inline]
    pub fn is_all_unresolved(&self) -> bool {
        self.slots.iter().all(|(_, slot)| slot.is_none())
    }

    /// Marks every parameter as unresolved.
    #[inline]
    pub fn reset(&mut self) {
        for (_, slot) in &mut self.slots {
            *slot = None;
        }
    }

    fn take(&mut self, name: &str) -> Option<Value> {
        self.slots
            .iter_mut()
            .find(|(n, _)| n == name)
            .and_then(|(_, slot)| slot.take())
    }
}

/// Resets the pending arguments when dropped, including when the
/// resolving future is abandoned.
struct ResetOnExit<'a>(&'a mut PendingArguments);

impl Deref for ResetOnExit<'_> {
    type Target = PendingArguments;

    fn deref(&self) -> &Self::Target {
        self.0
    }
}

impl DerefMut for ResetOnExit<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.0
    }
}

impl Drop for ResetOnExit<'_> {
    fn drop(&mut self) {
        self.0.reset();
    }
}

/// Fills unbound parameters from defaults or the configured source.
#[derive(Clone, Debug)]
pub struct ArgumentResolver {
    source: ArgumentSource,
    default_policy: DefaultPolicy,
    retry_limit: u32,
}

impl ArgumentResolver {
    /// Creates a resolver.
    ///
    /// `retry_limit` is how many times a source is asked again after an
    /// unusable value, so a parameter gets at most `retry_limit + 1`
    /// attempts.
    #[inline]
    pub fn new(
        source: ArgumentSource,
        default_policy: DefaultPolicy,
        retry_limit: u32,
    ) -> Self {
        Self {
            source,
            default_policy,
            retry_limit,
        }
    }

    /// Resolves every parameter of `spec`.
    ///
    /// Values already bound in `pending` are used as they are, after type
    /// validation. `pending` is all-unresolved when this returns, whatever
    /// the outcome.
    pub async fn resolve(
        &self,
        spec: &FunctionSpec,
        pending: &mut PendingArguments,
        history: &[ChatMessage],
    ) -> Result<Arguments, ArgumentResolutionError> {
        let mut pending = ResetOnExit(pending);
        let mut resolved = Vec::with_capacity(spec.params().len());

        for param in spec.params() {
            let value = match pending.take(param.name()) {
                Some(value) if param.ty().accepts(&value) => value,
                Some(value) => {
                    return Err(ArgumentResolutionError::invalid_value(
                        param.name(),
                    )
                    .with_reason(format!(
                        "bound value {value} is not of type {}",
                        param.ty()
                    )));
                }
                None => self.resolve_unbound(spec, param, history).await?,
            };
            trace!("resolved `{}` = {value}", param.name());
            resolved.push((param.name().to_owned(), value));
        }

        Ok(Arguments::from_pairs(resolved))
    }

    async fn resolve_unbound(
        &self,
        spec: &FunctionSpec,
        param: &Param,
        history: &[ChatMessage],
    ) -> Result<Value, ArgumentResolutionError> {
        let use_default = matches!(self.source, ArgumentSource::Defaults)
            || self.default_policy == DefaultPolicy::DefaultsWhenAbsent;
        if use_default {
            if let Some(default) = param.default() {
                return Ok(default.clone());
            }
        }

        match &self.source {
            ArgumentSource::Defaults => {
                Err(ArgumentResolutionError::missing_required(param.name()))
            }
            ArgumentSource::Model(generator) => {
                self.generate(generator.as_ref(), spec, param, history).await
            }
            ArgumentSource::Human(gate) => {
                let prompt_text = format!(
                    "Function `{}` needs a value for `{}`.",
                    spec.name(),
                    param.name()
                );
                gate.request(param, &prompt_text, self.retry_limit)
                    .await
                    .map_err(|rejected| {
                        let err = match &rejected.reason {
                            RejectReason::Invalid(_) => {
                                ArgumentResolutionError::invalid_value(
                                    param.name(),
                                )
                            }
                            RejectReason::NoInput => {
                                ArgumentResolutionError::missing_required(
                                    param.name(),
                                )
                            }
                        };
                        err.with_reason(rejected.to_string())
                    })
            }
        }
    }

    async fn generate(
        &self,
        generator: &dyn ArgumentGenerator,
        spec: &FunctionSpec,
        param: &Param,
        history: &[ChatMessage],
    ) -> Result<Value, ArgumentResolutionError> {
        let mut last_invalid = None;
        for attempt in 0..=self.retry_limit {
            match generator.generate(history, spec, param).await {
                Some(value) if param.ty().accepts(&value) => return Ok(value),
                Some(value) => {
                    debug!(
                        "attempt {attempt}: generated {value} is not of type {}",
                        param.ty()
                    );
                    last_invalid = Some(value);
                }
                None => {
                    debug!("attempt {attempt}: nothing generated");
                    last_invalid = None;
                }
            }
        }

        let attempts = self.retry_limit + 1;
        Err(match last_invalid {
            Some(value) => ArgumentResolutionError::invalid_value(param.name())
                .with_reason(format!(
                    "{value} is not of type {} after {attempts} attempt(s)",
                    param.ty()
                )),
            None => ArgumentResolutionError::missing_required(param.name())
                .with_reason(format!("no value after {attempts} attempt(s)")),
        })
    }
}
