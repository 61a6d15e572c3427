use std::error::Error;
use std::fmt::{self, Display};

/// An invalid agent configuration, reported when the agent is built.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ConfigurationError {
    /// No function was supplied.
    NoFunctionProvided,
    /// The visibility configuration includes no content class.
    EmptyVisibility,
    /// The function declares the same parameter twice.
    DuplicateParameter(String),
    /// A preset argument names a parameter the function doesn't declare.
    UnknownParameter(String),
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigurationError::NoFunctionProvided => {
                write!(f, "no function provided to execute")
            }
            ConfigurationError::EmptyVisibility => {
                write!(f, "visibility configuration includes nothing")
            }
            ConfigurationError::DuplicateParameter(name) => {
                write!(f, "parameter `{name}` is declared more than once")
            }
            ConfigurationError::UnknownParameter(name) => {
                write!(f, "function has no parameter named `{name}`")
            }
        }
    }
}

impl Error for ConfigurationError {}
