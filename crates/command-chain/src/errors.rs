use std::fmt;

use thiserror::Error;

/// Failure of a wrapped command or of a step chained onto its result.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// The raw command failed, after any retries it was allowed.
    #[error("{0}")]
    Failed(String),

    /// Asynchronous iteration over a value that is not a sequence.
    #[error("Can not iterate over non array")]
    NotIterable,

    #[error("{kind} has no command `{name}`")]
    UnknownCommand { name: String, kind: String },

    #[error("can not call `{name}` on a scalar value")]
    NotAnObject { name: String },

    #[error("value is not a sequence")]
    NotASequence,

    #[error("index {index} is out of range for a sequence of {len} elements")]
    IndexOutOfRange { index: usize, len: usize },

    /// The task driving the command panicked or was torn down with its runtime.
    #[error("command task did not finish: {0}")]
    Interrupted(String),
}

impl CommandError {
    pub fn failed(message: impl fmt::Display) -> Self {
        CommandError::Failed(message.to_string())
    }

    /// Raised locally by iteration, as opposed to a command failing.
    pub fn is_iteration_error(&self) -> bool {
        matches!(self, CommandError::NotIterable)
    }
}

impl From<serde_json::Error> for CommandError {
    fn from(err: serde_json::Error) -> Self {
        CommandError::Failed(err.to_string())
    }
}
