use std::any::Any;
use std::fmt;

use thiserror::Error;

/// Failure captured from a single hook invocation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HookError {
    /// The hook returned an error.
    #[error("{0}")]
    Failed(String),

    /// The hook panicked, either while being called or while its future was polled.
    #[error("hook panicked: {0}")]
    Panicked(String),
}

impl HookError {
    pub fn new(message: impl fmt::Display) -> Self {
        HookError::Failed(message.to_string())
    }

    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(msg) = payload.downcast_ref::<&str>() {
            (*msg).to_string()
        } else if let Some(msg) = payload.downcast_ref::<String>() {
            msg.clone()
        } else {
            "non-string panic payload".to_string()
        };
        HookError::Panicked(message)
    }
}

impl From<String> for HookError {
    fn from(message: String) -> Self {
        HookError::Failed(message)
    }
}

impl From<&str> for HookError {
    fn from(message: &str) -> Self {
        HookError::Failed(message.to_string())
    }
}

impl From<serde_json::Error> for HookError {
    fn from(err: serde_json::Error) -> Self {
        HookError::Failed(err.to_string())
    }
}
