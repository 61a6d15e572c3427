use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt::{self, Display};

/// The kind of resolution error that occurred.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No value could be obtained for a parameter without a default.
    MissingRequired,
    /// Every value obtained for a parameter failed validation.
    InvalidValue,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::MissingRequired => write!(f, "Missing required argument"),
            ErrorKind::InvalidValue => write!(f, "Invalid argument value"),
        }
    }
}

/// Describes why the arguments of a function could not be resolved.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Error {
    kind: ErrorKind,
    param: String,
    reason: Option<String>,
}

impl Error {
    /// Creates a new error with the `MissingRequired` kind.
    #[inline]
    pub fn missing_required<S: Into<String>>(param: S) -> Self {
        Self {
            kind: ErrorKind::MissingRequired,
            param: param.into(),
            reason: None,
        }
    }

    /// Creates a new error with the `InvalidValue` kind.
    #[inline]
    pub fn invalid_value<S: Into<String>>(param: S) -> Self {
        Self {
            kind: ErrorKind::InvalidValue,
            param: param.into(),
            reason: None,
        }
    }

    /// Attaches a reason to the error.
    #[inline]
    pub fn with_reason<S: Into<String>>(self, reason: S) -> Self {
        Self {
            reason: Some(reason.into()),
            ..self
        }
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the parameter that failed to resolve.
    #[inline]
    pub fn param(&self) -> &str {
        &self.param
    }

    /// Returns the reason for the error.
    #[inline]
    pub fn reason(&self) -> Cow<'_, str> {
        match self.reason.as_deref() {
            Some(reason) => Cow::Borrowed(reason),
            None => Cow::Owned(format!("{}", self.kind)),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}`: {}", self.param, self.reason())
    }
}

impl StdError for Error {}
