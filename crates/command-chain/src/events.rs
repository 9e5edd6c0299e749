use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use shim_core_types::InvocationId;
use shim_hooks::Hook;

use crate::errors::CommandError;
use crate::scope::ExecutionScope;
use crate::value::Resolved;

pub type BeforeCommandHook = Hook<CommandEvent>;
pub type AfterCommandHook = Hook<AfterCommandEvent>;

/// Argument of a `beforeCommand` hook.
#[derive(Clone, Serialize)]
pub struct CommandEvent {
    pub invocation: InvocationId,
    pub command: String,
    pub method: Option<String>,
    pub endpoint: Option<String>,
    pub args: Vec<Value>,
    /// Scope the command runs in; commands a hook issues through it do not
    /// fire hooks again.
    #[serde(skip)]
    pub scope: Arc<ExecutionScope>,
}

impl fmt::Debug for CommandEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandEvent")
            .field("invocation", &self.invocation)
            .field("command", &self.command)
            .field("method", &self.method)
            .field("endpoint", &self.endpoint)
            .field("args", &self.args)
            .finish()
    }
}

/// Argument of an `afterCommand` hook: the command plus how it settled.
#[derive(Clone, Debug)]
pub struct AfterCommandEvent {
    pub event: CommandEvent,
    pub result: Result<Resolved, CommandError>,
    pub elapsed: Duration,
}

impl AfterCommandEvent {
    pub fn command(&self) -> &str {
        &self.event.command
    }

    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn value(&self) -> Option<&Resolved> {
        self.result.as_ref().ok()
    }

    pub fn error(&self) -> Option<&CommandError> {
        self.result.as_ref().err()
    }
}
