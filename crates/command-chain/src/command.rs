use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde_json::Value;
use shim_core_types::InvocationId;
use shim_hooks::{run_hooks, HookArgs, HookOutcome};
use shim_retry::execute_with_retry;
use tracing::{debug, debug_span, trace, warn, Instrument};

use crate::deferred::Deferred;
use crate::errors::CommandError;
use crate::events::{AfterCommandEvent, CommandEvent};
use crate::scope::ExecutionScope;
use crate::value::{ChainTarget, Resolved};

/// Arguments a raw command is invoked with.
#[derive(Clone)]
pub struct CommandCall {
    pub scope: Arc<ExecutionScope>,
    /// Object the command was chained onto, if any.
    pub target: Option<Arc<dyn ChainTarget>>,
    pub args: Vec<Value>,
}

impl CommandCall {
    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn arg_str(&self, index: usize) -> Option<&str> {
        self.arg(index).and_then(Value::as_str)
    }

    pub fn target_property(&self, name: &str) -> Option<Value> {
        self.target.as_ref().and_then(|target| target.property(name))
    }
}

impl fmt::Debug for CommandCall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandCall")
            .field("target", &self.target)
            .field("args", &self.args)
            .finish()
    }
}

/// Primitive command supplied by the protocol layer.
#[async_trait]
pub trait RawCommand: Send + Sync {
    async fn invoke(&self, call: CommandCall) -> Result<Resolved, CommandError>;
}

#[async_trait]
impl<F, Fut> RawCommand for F
where
    F: Fn(CommandCall) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Resolved, CommandError>> + Send + 'static,
{
    async fn invoke(&self, call: CommandCall) -> Result<Resolved, CommandError> {
        (self)(call).await
    }
}

#[derive(Clone)]
struct CommandDef {
    name: String,
    method: Option<String>,
    endpoint: Option<String>,
    raw: Arc<dyn RawCommand>,
}

/// Lifecycle-aware command produced by [`wrap_command`].
#[derive(Clone)]
pub struct WrappedCommand {
    def: Arc<CommandDef>,
}

/// Wrap `raw` so every call runs through the command lifecycle and
/// returns a [`Deferred`].
pub fn wrap_command(name: impl Into<String>, raw: impl RawCommand + 'static) -> WrappedCommand {
    WrappedCommand {
        def: Arc::new(CommandDef {
            name: name.into(),
            method: None,
            endpoint: None,
            raw: Arc::new(raw),
        }),
    }
}

impl WrappedCommand {
    /// Protocol method and endpoint reported to lifecycle hooks.
    pub fn with_endpoint(mut self, method: impl Into<String>, endpoint: impl Into<String>) -> Self {
        let def = Arc::make_mut(&mut self.def);
        def.method = Some(method.into());
        def.endpoint = Some(endpoint.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }

    pub fn method(&self) -> Option<&str> {
        self.def.method.as_deref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.def.endpoint.as_deref()
    }

    /// Call the command without a target object.
    pub fn call(&self, scope: &Arc<ExecutionScope>, args: Vec<Value>) -> Deferred {
        self.invoke(scope, None, args)
    }

    /// Call the command on `target`.
    pub fn call_on(
        &self,
        scope: &Arc<ExecutionScope>,
        target: Arc<dyn ChainTarget>,
        args: Vec<Value>,
    ) -> Deferred {
        self.invoke(scope, Some(target), args)
    }

    fn invoke(
        &self,
        scope: &Arc<ExecutionScope>,
        target: Option<Arc<dyn ChainTarget>>,
        args: Vec<Value>,
    ) -> Deferred {
        let event = CommandEvent {
            invocation: InvocationId::new(),
            command: self.def.name.clone(),
            method: self.def.method.clone(),
            endpoint: self.def.endpoint.clone(),
            args: args.clone(),
            scope: Arc::clone(scope),
        };
        // Decided at call time so a call fires both rounds or neither.
        let fire_hooks = scope.hook_depth() == 0;
        let span = debug_span!("command", command = %event.command, invocation = %event.invocation);
        let lifecycle = Arc::clone(&self.def)
            .run(event, fire_hooks, target, args)
            .instrument(span);
        Deferred::spawn(Arc::clone(scope), lifecycle)
    }
}

impl CommandDef {
    async fn run(
        self: Arc<Self>,
        event: CommandEvent,
        fire_hooks: bool,
        target: Option<Arc<dyn ChainTarget>>,
        args: Vec<Value>,
    ) -> Result<Resolved, CommandError> {
        let scope = Arc::clone(&event.scope);
        if fire_hooks {
            before_round(&scope, &event).await;
        } else {
            trace!("issued inside a hook round, lifecycle hooks suppressed");
        }

        let started = Instant::now();
        let call = CommandCall {
            scope: Arc::clone(&scope),
            target,
            args,
        };
        let result = self.execute(&scope, call).await;
        match &result {
            Ok(value) => debug!(shape = value.shape(), "command settled"),
            Err(err) => debug!(error = %err, "command failed"),
        }

        if fire_hooks {
            let settled = AfterCommandEvent {
                event,
                result: result.clone(),
                elapsed: started.elapsed(),
            };
            after_round(&scope, settled).await;
        }
        result
    }

    async fn execute(
        &self,
        scope: &ExecutionScope,
        call: CommandCall,
    ) -> Result<Resolved, CommandError> {
        let Some(shared) = scope.retry_policy(&self.name) else {
            return self.raw.invoke(call).await;
        };

        let mut policy = shared.lock().fresh();
        let raw = &self.raw;
        let result = execute_with_retry(scope, |call: CommandCall| raw.invoke(call), &mut policy, call).await;
        // Write back the count only; the limit stays whatever the handle holds now.
        shared.lock().attempts = policy.attempts;
        result
    }
}

async fn before_round(scope: &ExecutionScope, event: &CommandEvent) {
    let hooks = &scope.options().before_command;
    if hooks.is_empty() {
        return;
    }
    let _window = scope.enter_hook_window();
    let outcomes = run_hooks("beforeCommand", hooks, HookArgs::broadcast(event.clone())).await;
    report_failures("beforeCommand", &event.command, &outcomes);
}

async fn after_round(scope: &ExecutionScope, settled: AfterCommandEvent) {
    let hooks = &scope.options().after_command;
    if hooks.is_empty() {
        return;
    }
    let command = settled.event.command.clone();
    let _window = scope.enter_hook_window();
    let outcomes = run_hooks("afterCommand", hooks, HookArgs::broadcast(settled)).await;
    report_failures("afterCommand", &command, &outcomes);
}

fn report_failures(event: &str, command: &str, outcomes: &[HookOutcome<Value>]) {
    for (index, outcome) in outcomes.iter().enumerate() {
        if let Some(err) = outcome.error() {
            warn!(event, command, hook = index, error = %err, "lifecycle hook failed");
        }
    }
}

impl fmt::Debug for WrappedCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrappedCommand")
            .field("name", &self.def.name)
            .field("method", &self.def.method)
            .field("endpoint", &self.def.endpoint)
            .finish()
    }
}
