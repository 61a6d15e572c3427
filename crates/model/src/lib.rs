//! An abstraction layer for the language models an agent talks to.
//!
//! The functional agent only needs two things from a model: a free-form
//! reply for the generation handler, and a candidate value when a function
//! argument has to be synthesized. Both are expressed as a single
//! non-streaming request/response exchange defined here.
//!
//! Types in this crate don't define any behavior, instead they are the
//! constraints that the implementors should adhere to.

#![deny(missing_docs)]

mod error;
mod provider;
mod request;
mod response;

pub use error::*;
pub use provider::*;
pub use request::*;
pub use response::*;
