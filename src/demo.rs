//! Scripted walk through the fixture page.
//!
//! Exercises every chain operation once: plain calls, retried calls,
//! chained element commands, aggregates and iteration.

use std::sync::Arc;

use futures::StreamExt;
use serde::Serialize;
use serde_json::{json, Value};
use shim_chain::{CommandError, ExecutionScope};
use tracing::{debug, info};

use crate::config::ShimConfig;
use crate::fixture::FixtureCatalogs;

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct DemoReport {
    pub session: String,
    pub title: String,
    pub ready_checks: u32,
    pub link_count: usize,
    pub tags: Vec<String>,
    pub submit_text: String,
    pub clicked: Vec<usize>,
    pub retries: Option<u32>,
    /// Error raised when iterating something that is not a sequence.
    pub iteration_error: Option<String>,
}

/// Scope for a demo run over `catalogs`, configured by `config`.
pub fn demo_scope(config: &ShimConfig, catalogs: &FixtureCatalogs) -> Arc<ExecutionScope> {
    let names = catalogs.command_names();
    config
        .apply_with_defaults(ExecutionScope::builder(), names.iter().map(String::as_str))
        .build()
}

pub async fn run_demo(
    scope: &Arc<ExecutionScope>,
    catalogs: &FixtureCatalogs,
) -> Result<DemoReport, CommandError> {
    let page = &catalogs.page;
    let browser = catalogs.session(scope);

    let title = browser.call("getTitle", vec![]).await?;
    info!(title = %title.to_json(), "page opened");

    browser.call("waitForReady", vec![]).await?;

    let links = browser.call("findElements", vec![json!("a")]);
    let link_count = links.len().await?;

    let tags = browser
        .call("findElements", vec![json!("*")])
        .map(|element, _| element.call("getTagName", vec![]))
        .map_values(|tag, _| tag.to_json().as_str().unwrap_or_default().to_string())
        .await?;

    let submit_text = browser
        .call("findElement", vec![json!("#submit")])
        .method("getText")
        .call(vec![])
        .await?;

    let mut elements = links.iter();
    while let Some(link) = elements.next().await {
        let link = link?;
        debug!(element = %link.property("elementId").await?.to_json(), "clicking link");
        link.call("click", vec![]).await?;
    }

    let iteration_error = match browser.call("getUrl", vec![]).iter().next().await {
        Some(Err(err)) if err.is_iteration_error() => Some(err.to_string()),
        _ => None,
    };

    Ok(DemoReport {
        session: scope.session().to_string(),
        title: text_of(title.to_json()),
        ready_checks: page.ready_checks(),
        link_count,
        tags,
        submit_text: text_of(submit_text.to_json()),
        clicked: page.clicked(),
        retries: scope.retries(),
        iteration_error,
    })
}

fn text_of(value: Value) -> String {
    match value {
        Value::String(text) => text,
        other => other.to_string(),
    }
}
