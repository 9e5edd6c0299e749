//! Deferred results.
//!
//! A [`Deferred`] stands for the eventual outcome of a wrapped command.
//! Every accessor composes a new step onto the pending outcome, so a chain
//! such as `find().index(0).call("getTagName", vec![])` can be written
//! without awaiting any intermediate link. Steps run in order along one
//! chain; an upstream failure settles every downstream step with the same
//! error without running it.
//!
//! Work starts when the Deferred is created, not when it is awaited: on a
//! tokio runtime every command and chained step runs as its own task, so
//! dropping a Deferred never cancels what it stands for. Outcomes are
//! shared, so several chains may branch off the same Deferred and the
//! underlying command still runs only once.

use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;

use async_recursion::async_recursion;
use futures::future::{self, BoxFuture, Shared};
use futures::stream::{self, BoxStream};
use futures::{FutureExt, StreamExt};
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, trace};

use crate::errors::CommandError;
use crate::scope::ExecutionScope;
use crate::value::Resolved;

type Outcome = Result<Resolved, CommandError>;

#[derive(Clone)]
pub struct Deferred {
    scope: Arc<ExecutionScope>,
    outcome: Shared<BoxFuture<'static, Outcome>>,
}

impl Deferred {
    pub(crate) fn new<F>(scope: Arc<ExecutionScope>, pending: F) -> Self
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        Self {
            scope,
            outcome: pending.boxed().shared(),
        }
    }

    /// Start `pending` as a task on the current runtime.
    ///
    /// Outside a runtime the work falls back to running when first polled.
    pub(crate) fn spawn<F>(scope: Arc<ExecutionScope>, pending: F) -> Self
    where
        F: Future<Output = Outcome> + Send + 'static,
    {
        match Handle::try_current() {
            Ok(runtime) => {
                let task = runtime.spawn(pending).map(|joined| {
                    joined.unwrap_or_else(|err| Err(CommandError::Interrupted(err.to_string())))
                });
                Self::new(scope, task)
            }
            Err(_) => {
                trace!("no runtime, deferring work until polled");
                Self::new(scope, pending)
            }
        }
    }

    /// Already-settled Deferred, e.g. for a root object or a sequence element.
    pub fn resolved(scope: &Arc<ExecutionScope>, value: Resolved) -> Self {
        Self::new(Arc::clone(scope), future::ready(Ok(value)))
    }

    pub fn rejected(scope: &Arc<ExecutionScope>, error: CommandError) -> Self {
        Self::new(Arc::clone(scope), future::ready(Err(error)))
    }

    pub fn scope(&self) -> &Arc<ExecutionScope> {
        &self.scope
    }

    /// Outcome, if some chain has already observed it settle.
    pub fn peek(&self) -> Option<&Outcome> {
        self.outcome.peek()
    }

    fn then<F, Fut>(&self, step: F) -> Deferred
    where
        F: FnOnce(Arc<ExecutionScope>, Resolved) -> Fut + Send + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let upstream = self.outcome.clone();
        let scope = Arc::clone(&self.scope);
        Deferred::spawn(Arc::clone(&self.scope), async move {
            let resolved = upstream.await?;
            step(scope, resolved).await
        })
    }

    /// Read a data property off the eventual value.
    ///
    /// Objects answer from their data properties, sequences expose
    /// `length`, JSON objects expose their fields. Anything else reads as
    /// null.
    pub fn property(&self, name: impl Into<String>) -> Deferred {
        let name = name.into();
        self.then(move |_, resolved| {
            let value = read_property(&resolved, &name);
            future::ready(Ok::<_, CommandError>(Resolved::Scalar(value)))
        })
    }

    pub fn method(&self, name: impl Into<String>) -> ChainedMethod {
        ChainedMethod {
            receiver: self.clone(),
            name: name.into(),
        }
    }

    /// Chain command `name` onto the eventual value.
    ///
    /// On a sequence the command is applied to each element in order and
    /// the Deferred settles with the sequence of their results.
    pub fn call(&self, name: impl Into<String>, args: Vec<Value>) -> Deferred {
        let name = name.into();
        self.then(move |scope, resolved| dispatch(scope, resolved, name, args))
    }

    pub fn index(&self, index: usize) -> Deferred {
        self.then(move |_, resolved| async move {
            let mut items = into_sequence(resolved)?;
            let len = items.len();
            if index < len {
                Ok::<_, CommandError>(items.swap_remove(index))
            } else {
                Err(CommandError::IndexOutOfRange { index, len })
            }
        })
    }

    /// Apply `f` to every element and collect what its Deferreds settle with.
    pub fn map<F>(&self, f: F) -> Deferred
    where
        F: Fn(Deferred, usize) -> Deferred + Send + Sync + 'static,
    {
        self.then(move |scope, resolved| async move {
            let items = into_sequence(resolved)?;
            let mut results = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let element = Deferred::resolved(&scope, item);
                results.push(f(element, index).await?);
            }
            Ok::<_, CommandError>(Resolved::Sequence(results))
        })
    }

    /// Keep the elements for which `predicate` holds.
    pub fn filter<F, Fut>(&self, predicate: F) -> Deferred
    where
        F: Fn(Deferred, usize) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<bool, CommandError>> + Send + 'static,
    {
        self.then(move |scope, resolved| async move {
            let items = into_sequence(resolved)?;
            let mut kept = Vec::new();
            for (index, item) in items.into_iter().enumerate() {
                if predicate(Deferred::resolved(&scope, item.clone()), index).await? {
                    kept.push(item);
                }
            }
            Ok::<_, CommandError>(Resolved::Sequence(kept))
        })
    }

    /// Map the settled elements with a plain function.
    pub async fn map_values<F, T>(&self, mut f: F) -> Result<Vec<T>, CommandError>
    where
        F: FnMut(&Resolved, usize) -> T,
    {
        let items = into_sequence(self.outcome.clone().await?)?;
        Ok(items.iter().enumerate().map(|(index, item)| f(item, index)).collect())
    }

    pub async fn for_each<F, Fut>(&self, mut f: F) -> Result<(), CommandError>
    where
        F: FnMut(Deferred, usize) -> Fut,
        Fut: Future<Output = ()>,
    {
        let items = into_sequence(self.outcome.clone().await?)?;
        for (index, item) in items.into_iter().enumerate() {
            f(Deferred::resolved(&self.scope, item), index).await;
        }
        Ok(())
    }

    pub async fn len(&self) -> Result<usize, CommandError> {
        into_sequence(self.outcome.clone().await?).map(|items| items.len())
    }

    /// Iterate the eventual sequence element by element.
    ///
    /// A value that settles as anything but a sequence yields a single
    /// [`CommandError::NotIterable`]; an upstream failure yields that failure.
    pub fn iter(&self) -> BoxStream<'static, Result<Deferred, CommandError>> {
        let scope = Arc::clone(&self.scope);
        self.outcome
            .clone()
            .into_stream()
            .flat_map(move |outcome| match outcome {
                Ok(Resolved::Sequence(items)) => {
                    let scope = Arc::clone(&scope);
                    stream::iter(items)
                        .map(move |item| Ok(Deferred::resolved(&scope, item)))
                        .boxed()
                }
                Ok(_) => stream::once(future::ready(Err(CommandError::NotIterable))).boxed(),
                Err(err) => stream::once(future::ready(Err(err))).boxed(),
            })
            .boxed()
    }
}

impl IntoFuture for Deferred {
    type Output = Outcome;
    type IntoFuture = Shared<BoxFuture<'static, Outcome>>;

    fn into_future(self) -> Self::IntoFuture {
        self.outcome
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.peek() {
            None => "pending",
            Some(Ok(_)) => "settled",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("Deferred").field("state", &state).finish()
    }
}

/// Command looked up on a Deferred, called later with its arguments.
#[derive(Clone, Debug)]
pub struct ChainedMethod {
    receiver: Deferred,
    name: String,
}

impl ChainedMethod {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, args: Vec<Value>) -> Deferred {
        self.receiver.call(self.name.clone(), args)
    }
}

#[async_recursion]
async fn dispatch(
    scope: Arc<ExecutionScope>,
    receiver: Resolved,
    name: String,
    args: Vec<Value>,
) -> Outcome {
    match receiver {
        Resolved::Single(target) => {
            let command = target
                .command(&name)
                .ok_or_else(|| CommandError::UnknownCommand {
                    name: name.clone(),
                    kind: target.kind().to_string(),
                })?;
            command.call_on(&scope, target, args).await
        }
        Resolved::Sequence(items) => {
            debug!(command = %name, elements = items.len(), "applying command to each element");
            let mut results = Vec::with_capacity(items.len());
            for item in items {
                results.push(dispatch(Arc::clone(&scope), item, name.clone(), args.clone()).await?);
            }
            Ok(Resolved::Sequence(results))
        }
        Resolved::Scalar(_) => Err(CommandError::NotAnObject { name }),
    }
}

fn read_property(resolved: &Resolved, name: &str) -> Value {
    match resolved {
        Resolved::Single(target) => target.property(name).unwrap_or(Value::Null),
        Resolved::Sequence(items) if name == "length" => Value::from(items.len()),
        Resolved::Scalar(Value::Object(fields)) => fields.get(name).cloned().unwrap_or(Value::Null),
        _ => Value::Null,
    }
}

fn into_sequence(resolved: Resolved) -> Result<Vec<Resolved>, CommandError> {
    match resolved {
        Resolved::Sequence(items) => Ok(items),
        _ => Err(CommandError::NotASequence),
    }
}
