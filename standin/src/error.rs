// vim: tw=80
//! Everything that can go wrong while installing, invoking, verifying or
//! tearing down an expectation.

use std::{
    borrow::Cow,
    fmt,
    panic
};

use thiserror::Error;

/// Errors detected by the engine.
///
/// Every variant names the mocked target (`Type#id` for a single instance,
/// just `Type` for any-instance expectations) and the operation, so a failing
/// test explains itself without a look at the engine's internals.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum Error {
    /// The target does not declare an operation with this name.
    #[error("{target} does not expose an operation named `{operation}`")]
    NoSuchOperation {
        target: String,
        operation: &'static str,
    },

    /// The target's seam routes to a different registry, or to none at all.
    #[error("{target} is not attached to this registry; construct it with \
             Registry::seam() to mock `{operation}`")]
    DetachedTarget {
        target: String,
        operation: &'static str,
    },

    /// The operation is already mocked with different argument, return or
    /// yield types.
    #[error("{target}.{operation} is already mocked with another signature: \
             {detail}")]
    SignatureMismatch {
        target: String,
        operation: &'static str,
        detail: String,
    },

    /// The operation was called after its call budget ran out.
    #[error("{target}.{operation} called too many times (expected {expected} \
             call(s))")]
    CallBudgetExceeded {
        target: String,
        operation: &'static str,
        expected: usize,
    },

    /// The actual arguments did not satisfy the configured matcher.
    #[error("{target}.{operation}: {detail}")]
    ArgumentMismatch {
        target: String,
        operation: &'static str,
        detail: String,
    },

    /// A yield was configured but the caller passed no block.
    #[error("{target}.{operation} expected to yield, no block given")]
    MissingBlock {
        target: String,
        operation: &'static str,
    },

    /// Nothing was configured to produce the operation's return value.
    #[error("{target}.{operation} has no return value; configure one with \
             returns() or returning()")]
    MissingReturnValue {
        target: String,
        operation: &'static str,
    },

    /// The expectation's minimum call count was not met.
    #[error("{target}.{operation} expected. not called {remaining} more \
             time(s) (called {called} time(s))")]
    VerificationFailed {
        target: String,
        operation: &'static str,
        remaining: usize,
        called: usize,
    },

    /// The mock was configured to fail with this error.
    #[error(transparent)]
    Scripted(#[from] ScriptedFailure),
}

impl Error {
    /// Abort the current test with this error.
    ///
    /// Engine errors panic with their message.  A [`ScriptedFailure`] is
    /// raised as the panic payload itself, so callers that catch the unwind
    /// can downcast it back.
    pub fn fail(self) -> ! {
        match self {
            Error::Scripted(failure) => panic::panic_any(failure),
            e => panic!("{}", e)
        }
    }

    /// The operation the error is about.
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            Error::NoSuchOperation { operation, .. } |
            Error::DetachedTarget { operation, .. } |
            Error::SignatureMismatch { operation, .. } |
            Error::CallBudgetExceeded { operation, .. } |
            Error::ArgumentMismatch { operation, .. } |
            Error::MissingBlock { operation, .. } |
            Error::MissingReturnValue { operation, .. } |
            Error::VerificationFailed { operation, .. } => Some(*operation),
            Error::Scripted(_) => None
        }
    }
}

/// An error a mock was told to raise with
/// [`Expectation::raises`](crate::Expectation::raises).
///
/// This is not an engine failure: it is the engine faithfully reproducing the
/// configured behavior.  It carries an error kind, a message and an optional
/// trace, and is what a test will find as the panic payload when it calls a
/// mocked operation through [`Operation::call`](crate::Operation::call).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScriptedFailure {
    kind: Cow<'static, str>,
    message: String,
    trace: Vec<String>,
}

impl ScriptedFailure {
    pub fn new(kind: impl Into<Cow<'static, str>>) -> Self {
        ScriptedFailure {
            kind: kind.into(),
            message: String::new(),
            trace: Vec::new()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_trace<S>(mut self, trace: impl IntoIterator<Item=S>) -> Self
        where S: Into<String>
    {
        self.trace = trace.into_iter().map(Into::into).collect();
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn trace(&self) -> &[String] {
        &self.trace
    }
}

impl Default for ScriptedFailure {
    fn default() -> Self {
        ScriptedFailure::new("RuntimeError")
    }
}

impl From<&str> for ScriptedFailure {
    fn from(message: &str) -> Self {
        ScriptedFailure::default().with_message(message)
    }
}

impl From<String> for ScriptedFailure {
    fn from(message: String) -> Self {
        ScriptedFailure::default().with_message(message)
    }
}

impl fmt::Display for ScriptedFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.message.is_empty() {
            f.write_str(&self.kind)?;
        } else {
            write!(f, "{}: {}", self.kind, self.message)?;
        }
        for frame in &self.trace {
            write!(f, "\n    at {}", frame)?;
        }
        Ok(())
    }
}

impl std::error::Error for ScriptedFailure {}

/// Verification failures collected by
/// [`Registry::teardown`](crate::Registry::teardown).
///
/// Teardown restores every expectation even when some of them fail to
/// verify, so this carries all of the failures rather than the first one.
#[derive(Clone, Debug, Error, PartialEq)]
#[error("{} expectation(s) failed verification:\n{}", .failures.len(),
        summarize(.failures))]
pub struct TeardownError {
    failures: Vec<Error>,
}

impl TeardownError {
    pub(crate) fn new(failures: Vec<Error>) -> Self {
        TeardownError { failures }
    }

    pub fn failures(&self) -> &[Error] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<Error> {
        self.failures
    }
}

fn summarize(failures: &[Error]) -> String {
    failures.iter()
        .map(|e| format!("  - {}", e))
        .collect::<Vec<_>>()
        .join("\n")
}
