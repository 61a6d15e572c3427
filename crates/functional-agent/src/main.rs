//! A simple program demonstrates how to use `functional-agent` as a library.
//!
//! Run with `counter` (the default), `divide` or `divide-model` as the
//! first argument. `divide` asks for the arguments on the terminal, and
//! `divide-model` lets the model pick them from the chat.

#[macro_use]
extern crate tracing;

use std::env;
use std::io::Write as _;
use std::sync::Arc;

use functional_agent::TerminalPrompt;
use functional_agent::core::{
    ArgumentSource, ChatSession, FunctionSpec, FunctionalAgentBuilder,
    HumanInputGate, HumanPrompt, ModelArgumentGenerator, ModelClient,
    VisibilityConfig,
};
use functional_agent::functions;
use functional_agent_openai_model::{OpenAIConfigBuilder, OpenAIProvider};
use owo_colors::OwoColorize;

const BAR_CHAR: &str = "▎";
const USER: &str = "user_proxy";
const AGENT: &str = "chatbot";

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let prompt = Arc::new(TerminalPrompt::new());
    let provider = model_provider();

    let demo = env::args().nth(1).unwrap_or_else(|| "counter".to_owned());
    let (function, source) = match demo.as_str() {
        "counter" => (functions::counter(), ArgumentSource::Defaults),
        "divide" => {
            let shared: Arc<dyn HumanPrompt> = prompt.clone();
            let gate = HumanInputGate::from_shared(shared);
            (functions::divide(), ArgumentSource::human(gate))
        }
        "divide-model" => {
            let Some(provider) = &provider else {
                eprintln!("OPENAI_API_KEY environment variable is not set");
                return;
            };
            let client = ModelClient::new(provider.clone());
            let generator = ModelArgumentGenerator::new(client, AGENT);
            (functions::divide(), ArgumentSource::model(generator))
        }
        other => {
            eprintln!(
                "unknown demo `{other}`, expected `counter`, `divide` or \
                 `divide-model`"
            );
            return;
        }
    };

    let mut builder = agent_builder(function, source);
    if let Some(provider) = provider {
        builder = builder
            .with_model_provider(provider)
            .with_system_message("You are a helpful assistant.");
    } else {
        warn!("OPENAI_API_KEY is not set, running without generation");
    }
    let agent = match builder.build() {
        Ok(agent) => agent,
        Err(err) => {
            eprintln!("failed to build the agent: {err}");
            return;
        }
    };

    let mut session = ChatSession::new(Arc::new(agent));
    loop {
        print!("> ");
        std::io::stdout().flush().ok();

        let Some(line) = prompt.read_line().await else {
            break;
        };
        let line = line.trim();
        if line == "exit" {
            break;
        }

        let reply = match session.exchange(USER, line).await {
            Ok(reply) => reply,
            Err(err) => {
                error!("{}", err);
                break;
            }
        };
        match reply.content {
            Some(content) => println!(
                "{}🤖 {}",
                BAR_CHAR.bright_cyan(),
                content.bright_white()
            ),
            None if reply.is_final => break,
            None => println!("{}(no reply)", BAR_CHAR.bright_black()),
        }
    }
}

fn agent_builder(
    function: FunctionSpec,
    source: ArgumentSource,
) -> FunctionalAgentBuilder {
    FunctionalAgentBuilder::new(AGENT)
        .with_function(function)
        .with_argument_source(source)
        .with_visibility(VisibilityConfig::default())
}

fn model_provider() -> Option<OpenAIProvider> {
    let api_key = env::var("OPENAI_API_KEY").ok()?;
    let mut config = OpenAIConfigBuilder::with_api_key(api_key);
    if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
        config = config.with_base_url(base_url);
    }
    if let Ok(model) = env::var("OPENAI_MODEL") {
        config = config.with_model(model);
    }
    Some(OpenAIProvider::new(config.build()))
}
