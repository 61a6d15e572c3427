//! Scripted collaborators shared by the unit tests.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::arguments::ArgumentGenerator;
use crate::conversation::ChatMessage;
use crate::function::{FunctionSpec, Param};
use crate::human::HumanPrompt;

#[derive(Default)]
struct PromptScript {
    answers: VecDeque<String>,
    repeat: Option<String>,
    prompts: Vec<String>,
}

/// Answers prompts from a script; `None` once the script runs out.
#[derive(Clone, Default)]
pub struct ScriptedPrompt(Arc<Mutex<PromptScript>>);

impl ScriptedPrompt {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let script = PromptScript {
            answers: answers.into_iter().map(Into::into).collect(),
            ..Default::default()
        };
        Self(Arc::new(Mutex::new(script)))
    }

    pub fn repeat<S: Into<String>>(answer: S) -> Self {
        let script = PromptScript {
            repeat: Some(answer.into()),
            ..Default::default()
        };
        Self(Arc::new(Mutex::new(script)))
    }

    pub fn prompts(&self) -> Vec<String> {
        self.0.lock().unwrap().prompts.clone()
    }
}

#[async_trait]
impl HumanPrompt for ScriptedPrompt {
    async fn prompt(&self, text: &str) -> Option<String> {
        let mut script = self.0.lock().unwrap();
        script.prompts.push(text.to_owned());
        script
            .answers
            .pop_front()
            .or_else(|| script.repeat.clone())
    }
}

/// Never answers, records that it has been asked.
#[derive(Clone, Default)]
pub struct StalledPrompt(Arc<Mutex<u32>>);

impl StalledPrompt {
    pub fn asked(&self) -> u32 {
        *self.0.lock().unwrap()
    }
}

#[async_trait]
impl HumanPrompt for StalledPrompt {
    async fn prompt(&self, _text: &str) -> Option<String> {
        *self.0.lock().unwrap() += 1;
        std::future::pending().await
    }
}

#[derive(Default)]
struct GeneratorScript {
    values: VecDeque<Option<Value>>,
    repeat: Option<Value>,
    calls: u32,
}

/// Generates values from a script; `None` once the script runs out.
#[derive(Clone, Default)]
pub struct ScriptedGenerator(Arc<Mutex<GeneratorScript>>);

impl ScriptedGenerator {
    pub fn new<I: IntoIterator<Item = Option<Value>>>(values: I) -> Self {
        let script = GeneratorScript {
            values: values.into_iter().collect(),
            ..Default::default()
        };
        Self(Arc::new(Mutex::new(script)))
    }

    pub fn repeat(value: Value) -> Self {
        let script = GeneratorScript {
            repeat: Some(value),
            ..Default::default()
        };
        Self(Arc::new(Mutex::new(script)))
    }

    pub fn calls(&self) -> u32 {
        self.0.lock().unwrap().calls
    }
}

#[async_trait]
impl ArgumentGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        _history: &[ChatMessage],
        _function: &FunctionSpec,
        _param: &Param,
    ) -> Option<Value> {
        let mut script = self.0.lock().unwrap();
        script.calls += 1;
        match script.values.pop_front() {
            Some(value) => value,
            None => script.repeat.clone(),
        }
    }
}
