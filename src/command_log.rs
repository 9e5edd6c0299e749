//! Built-in hooks that trace every command a scope runs.

use serde_json::Value;
use shim_chain::{AfterCommandEvent, AfterCommandHook, BeforeCommandHook, CommandEvent, Hook};
use tracing::{info, warn};

const TARGET: &str = "command_shim::commands";

pub fn before_hook() -> BeforeCommandHook {
    Hook::from_fn(|event: Option<CommandEvent>| {
        if let Some(event) = event {
            let args = Value::Array(event.args.clone());
            info!(
                target: TARGET,
                invocation = %event.invocation,
                command = %event.command,
                endpoint = event.endpoint.as_deref().unwrap_or("-"),
                args = %args,
                "command started"
            );
        }
        Ok(Value::Null)
    })
}

pub fn after_hook() -> AfterCommandHook {
    Hook::from_fn(|event: Option<AfterCommandEvent>| {
        let Some(event) = event else {
            return Ok(Value::Null);
        };
        let elapsed_ms = event.elapsed.as_millis() as u64;
        match &event.result {
            Ok(value) => info!(
                target: TARGET,
                invocation = %event.event.invocation,
                command = event.command(),
                elapsed_ms,
                shape = value.shape(),
                "command finished"
            ),
            Err(err) => warn!(
                target: TARGET,
                invocation = %event.event.invocation,
                command = event.command(),
                elapsed_ms,
                error = %err,
                "command failed"
            ),
        }
        Ok(Value::Null)
    })
}
