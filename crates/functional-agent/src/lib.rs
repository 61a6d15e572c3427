//! An out-of-the-box functional agent for the terminal.
//!
//! The crate includes a demo CLI that chats with an agent guaranteed to run
//! a function on each turn. It can also be used as a library for the
//! terminal prompt and the demo functions.

#![deny(missing_docs)]

#[allow(unused_imports)]
#[macro_use]
extern crate tracing;

pub mod functions;
mod prompt;

pub use prompt::TerminalPrompt;

/// Re-exports of [`functional_agent_core`] crate.
pub mod core {
    pub use functional_agent_core::*;
}
