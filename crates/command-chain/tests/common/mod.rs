#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use shim_chain::{
    wrap_command, CommandCall, CommandCatalog, CommandError, Deferred, ExecutionScope,
    RemoteObject, Resolved,
};

/// Names of the raw commands that actually ran, in call order.
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// (tag, text) of every element on the fixture page, in document order.
pub const PAGE: &[(&str, &str)] = &[("a", "Home"), ("button", "Submit"), ("input", "")];

pub fn call_log() -> CallLog {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().clone()
}

pub fn count(log: &CallLog, command: &str) -> usize {
    log.lock().iter().filter(|name| name.as_str() == command).count()
}

fn element(catalog: &Arc<CommandCatalog>, position: usize) -> Resolved {
    let (tag, text) = PAGE[position];
    Resolved::object(
        RemoteObject::new("element", Arc::clone(catalog))
            .with_property("elementId", format!("element-{position}"))
            .with_property("position", position)
            .with_property("selector", tag)
            .with_property("tagName", tag)
            .with_property("text", text),
    )
}

fn position_of(call: &CommandCall) -> Result<usize, CommandError> {
    call.target_property("position")
        .and_then(|value| value.as_u64())
        .map(|value| value as usize)
        .ok_or_else(|| CommandError::failed("command needs an element"))
}

fn element_catalog(log: &CallLog) -> Arc<CommandCatalog> {
    // Elements need their own catalog to produce siblings, so it is built
    // in two steps around a shared cell.
    let cell: Arc<Mutex<Option<Arc<CommandCatalog>>>> = Arc::new(Mutex::new(None));

    let tag_log = Arc::clone(log);
    let text_log = Arc::clone(log);
    let click_log = Arc::clone(log);
    let sibling_log = Arc::clone(log);
    let sibling_cell = Arc::clone(&cell);

    let catalog = CommandCatalog::new()
        .with(
            wrap_command("getTagName", move |call: CommandCall| {
                tag_log.lock().push("getTagName".into());
                async move {
                    Ok::<_, CommandError>(Resolved::Scalar(
                        call.target_property("tagName").unwrap_or_default(),
                    ))
                }
            })
            .with_endpoint("GET", "/session/:sessionId/element/:elementId/name"),
        )
        .with(wrap_command("getText", move |call: CommandCall| {
            text_log.lock().push("getText".into());
            async move {
                Ok::<_, CommandError>(Resolved::Scalar(call.target_property("text").unwrap_or_default()))
            }
        }))
        .with(wrap_command("click", move |_call: CommandCall| {
            click_log.lock().push("click".into());
            async move { Ok::<_, CommandError>(Resolved::null()) }
        }))
        .with(wrap_command("nextSibling", move |call: CommandCall| {
            sibling_log.lock().push("nextSibling".into());
            let catalog = sibling_cell.lock().clone();
            async move {
                let position = position_of(&call)? + 1;
                match catalog {
                    Some(catalog) if position < PAGE.len() => Ok::<_, CommandError>(element(&catalog, position)),
                    _ => Err(CommandError::failed("no such element")),
                }
            }
        }))
        .into_shared();

    *cell.lock() = Some(Arc::clone(&catalog));
    catalog
}

/// Catalog of the session object: element queries, title and a command
/// that fails `flaky_failures` times before succeeding.
pub fn browser_catalog(log: &CallLog, flaky_failures: usize) -> Arc<CommandCatalog> {
    let elements = element_catalog(log);
    let single = Arc::clone(&elements);

    let find_all_log = Arc::clone(log);
    let find_log = Arc::clone(log);
    let title_log = Arc::clone(log);
    let flaky_log = Arc::clone(log);

    CommandCatalog::new()
        .with(
            wrap_command("findElements", move |call: CommandCall| {
                find_all_log.lock().push("findElements".into());
                let elements = Arc::clone(&elements);
                async move {
                    let selector = call.arg_str(0).unwrap_or("*").to_string();
                    let found = PAGE
                        .iter()
                        .enumerate()
                        .filter(|(_, (tag, _))| selector == "*" || selector == *tag)
                        .map(|(position, _)| element(&elements, position));
                    Ok::<_, CommandError>(Resolved::sequence(found))
                }
            })
            .with_endpoint("POST", "/session/:sessionId/elements"),
        )
        .with(
            wrap_command("findElement", move |call: CommandCall| {
                find_log.lock().push("findElement".into());
                let elements = Arc::clone(&single);
                async move {
                    let selector = call.arg_str(0).unwrap_or_default().to_string();
                    PAGE.iter()
                        .position(|(tag, _)| *tag == selector)
                        .map(|position| element(&elements, position))
                        .ok_or_else(|| CommandError::failed("no such element"))
                }
            })
            .with_endpoint("POST", "/session/:sessionId/element"),
        )
        .with(wrap_command("getTitle", move |_call: CommandCall| {
            title_log.lock().push("getTitle".into());
            async move { Ok::<_, CommandError>(Resolved::scalar("Fixture page")) }
        }))
        .with(wrap_command("flaky", move |_call: CommandCall| {
            let mut log = flaky_log.lock();
            log.push("flaky".into());
            let seen = log.iter().filter(|name| name.as_str() == "flaky").count();
            async move {
                if seen <= flaky_failures {
                    Err::<Resolved, _>(CommandError::failed(format!("flaky failure {seen}")))
                } else {
                    Ok(Resolved::scalar(true))
                }
            }
        }))
        .into_shared()
}

/// Root Deferred for the session object.
pub fn browser(scope: &Arc<ExecutionScope>, log: &CallLog, flaky_failures: usize) -> Deferred {
    let catalog = browser_catalog(log, flaky_failures);
    Deferred::resolved(
        scope,
        Resolved::object(RemoteObject::new("browser", catalog).with_property("sessionId", "fixture")),
    )
}

pub fn json_of(resolved: Result<Resolved, CommandError>) -> Value {
    resolved.expect("command settled").to_json()
}
