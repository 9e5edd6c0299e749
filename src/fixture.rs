//! In-memory page used by the `demo` command and the integration tests.
//!
//! The page exposes a browser object and element objects through
//! [`CommandCatalog`]s, the same seam a real protocol layer would use.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shim_chain::{
    wrap_command, CommandCall, CommandCatalog, CommandError, Deferred, ExecutionScope,
    RemoteObject, Resolved,
};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixtureElement {
    pub tag: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub text: String,
}

impl FixtureElement {
    pub fn new(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            id: None,
            text: text.into(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Supports `*`, `#id` and bare tag names.
    fn matches(&self, selector: &str) -> bool {
        match selector.strip_prefix('#') {
            Some(id) => self.id.as_deref() == Some(id),
            None => selector == "*" || selector == self.tag,
        }
    }
}

#[derive(Debug, Default)]
struct PageState {
    ready_checks: u32,
    clicked: Vec<usize>,
}

#[derive(Debug)]
pub struct FixturePage {
    title: String,
    url: String,
    elements: Vec<FixtureElement>,
    /// `waitForReady` fails this many times before the page reports ready.
    not_ready_checks: u32,
    state: Mutex<PageState>,
}

impl FixturePage {
    pub fn new(title: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            elements: Vec::new(),
            not_ready_checks: 0,
            state: Mutex::new(PageState::default()),
        }
    }

    pub fn with_element(mut self, element: FixtureElement) -> Self {
        self.elements.push(element);
        self
    }

    pub fn not_ready_for(mut self, checks: u32) -> Self {
        self.not_ready_checks = checks;
        self
    }

    /// Small search form used by the demo.
    pub fn search_form() -> Self {
        Self::new("Command shim fixture", "https://fixture.test/search")
            .with_element(FixtureElement::new("a", "Home").with_id("home"))
            .with_element(FixtureElement::new("a", "About").with_id("about"))
            .with_element(FixtureElement::new("input", "").with_id("query"))
            .with_element(FixtureElement::new("button", "Search").with_id("submit"))
    }

    pub fn elements(&self) -> &[FixtureElement] {
        &self.elements
    }

    pub fn ready_checks(&self) -> u32 {
        self.state.lock().ready_checks
    }

    /// Positions of clicked elements, in click order.
    pub fn clicked(&self) -> Vec<usize> {
        self.state.lock().clicked.clone()
    }

    fn matching(&self, selector: &str) -> impl Iterator<Item = usize> + '_ {
        let selector = selector.to_string();
        self.elements
            .iter()
            .enumerate()
            .filter(move |(_, element)| element.matches(&selector))
            .map(|(position, _)| position)
    }

    fn check_ready(&self) -> Result<(), CommandError> {
        let mut state = self.state.lock();
        state.ready_checks += 1;
        if state.ready_checks <= self.not_ready_checks {
            Err(CommandError::failed(format!(
                "page not ready (check {})",
                state.ready_checks
            )))
        } else {
            Ok(())
        }
    }
}

/// Object catalogs of one fixture page.
#[derive(Clone, Debug)]
pub struct FixtureCatalogs {
    pub page: Arc<FixturePage>,
    pub browser: Arc<CommandCatalog>,
    pub element: Arc<CommandCatalog>,
}

impl FixtureCatalogs {
    /// Root Deferred for the browser object of the page.
    pub fn session(&self, scope: &Arc<ExecutionScope>) -> Deferred {
        let browser = RemoteObject::new("browser", Arc::clone(&self.browser))
            .with_property("sessionId", scope.session().to_string())
            .with_property("url", self.page.url.clone());
        Deferred::resolved(scope, Resolved::object(browser))
    }

    /// Every command name either catalog answers to.
    pub fn command_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .browser
            .names()
            .into_iter()
            .chain(self.element.names())
            .map(str::to_string)
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

pub fn catalogs(page: &Arc<FixturePage>) -> FixtureCatalogs {
    let element = element_catalog(page);
    let browser = browser_catalog(page, &element);
    FixtureCatalogs {
        page: Arc::clone(page),
        browser,
        element,
    }
}

fn element_object(page: &FixturePage, catalog: &Arc<CommandCatalog>, position: usize) -> Resolved {
    let element = &page.elements[position];
    let mut object = RemoteObject::new("element", Arc::clone(catalog))
        .with_property("elementId", format!("element-{position}"))
        .with_property("position", position)
        .with_property("tagName", element.tag.clone());
    if let Some(id) = &element.id {
        object = object.with_property("id", id.clone());
    }
    Resolved::object(object)
}

fn selector(call: &CommandCall) -> Result<String, CommandError> {
    call.arg_str(0)
        .map(str::to_string)
        .ok_or_else(|| CommandError::failed("selector argument must be a string"))
}

fn position(call: &CommandCall) -> Result<usize, CommandError> {
    call.target_property("position")
        .and_then(|value| value.as_u64())
        .map(|value| value as usize)
        .ok_or_else(|| CommandError::failed("command must be chained onto an element"))
}

fn element_at<'a>(
    page: &'a FixturePage,
    call: &CommandCall,
) -> Result<(usize, &'a FixtureElement), CommandError> {
    let at = position(call)?;
    page.elements
        .get(at)
        .map(|element| (at, element))
        .ok_or_else(|| CommandError::failed(format!("stale element reference: element-{at}")))
}

fn browser_catalog(page: &Arc<FixturePage>, elements: &Arc<CommandCatalog>) -> Arc<CommandCatalog> {
    let title_page = Arc::clone(page);
    let url_page = Arc::clone(page);
    let ready_page = Arc::clone(page);
    let find_page = Arc::clone(page);
    let find_catalog = Arc::clone(elements);
    let find_all_page = Arc::clone(page);
    let find_all_catalog = Arc::clone(elements);

    CommandCatalog::new()
        .with(
            wrap_command("getTitle", move |_call: CommandCall| {
                let title = title_page.title.clone();
                async move { Ok::<_, CommandError>(Resolved::scalar(title)) }
            })
            .with_endpoint("GET", "/session/:sessionId/title"),
        )
        .with(
            wrap_command("getUrl", move |_call: CommandCall| {
                let url = url_page.url.clone();
                async move { Ok::<_, CommandError>(Resolved::scalar(url)) }
            })
            .with_endpoint("GET", "/session/:sessionId/url"),
        )
        .with(wrap_command("waitForReady", move |_call: CommandCall| {
            let ready = ready_page.check_ready().map(|()| Resolved::scalar(true));
            async move { ready }
        }))
        .with(
            wrap_command("findElement", move |call: CommandCall| {
                let page = Arc::clone(&find_page);
                let catalog = Arc::clone(&find_catalog);
                async move {
                    let selector = selector(&call)?;
                    page.matching(&selector)
                        .next()
                        .map(|position| element_object(&page, &catalog, position))
                        .ok_or_else(|| CommandError::failed(format!("no such element: {selector}")))
                }
            })
            .with_endpoint("POST", "/session/:sessionId/element"),
        )
        .with(
            wrap_command("findElements", move |call: CommandCall| {
                let page = Arc::clone(&find_all_page);
                let catalog = Arc::clone(&find_all_catalog);
                async move {
                    let selector = selector(&call)?;
                    let found: Vec<Resolved> = page
                        .matching(&selector)
                        .map(|position| element_object(&page, &catalog, position))
                        .collect();
                    Ok::<_, CommandError>(Resolved::Sequence(found))
                }
            })
            .with_endpoint("POST", "/session/:sessionId/elements"),
        )
        .into_shared()
}

fn element_catalog(page: &Arc<FixturePage>) -> Arc<CommandCatalog> {
    let tag_page = Arc::clone(page);
    let text_page = Arc::clone(page);
    let click_page = Arc::clone(page);

    CommandCatalog::new()
        .with(
            wrap_command("getTagName", move |call: CommandCall| {
                let tag = element_at(&tag_page, &call).map(|(_, element)| Resolved::scalar(element.tag.clone()));
                async move { tag }
            })
            .with_endpoint("GET", "/session/:sessionId/element/:elementId/name"),
        )
        .with(
            wrap_command("getText", move |call: CommandCall| {
                let text = element_at(&text_page, &call).map(|(_, element)| Resolved::scalar(element.text.clone()));
                async move { text }
            })
            .with_endpoint("GET", "/session/:sessionId/element/:elementId/text"),
        )
        .with(
            wrap_command("click", move |call: CommandCall| {
                let clicked = element_at(&click_page, &call).map(|(at, _)| {
                    click_page.state.lock().clicked.push(at);
                    Resolved::Scalar(Value::Null)
                });
                async move { clicked }
            })
            .with_endpoint("POST", "/session/:sessionId/element/:elementId/click"),
        )
        .into_shared()
}
