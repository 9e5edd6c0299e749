use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::future::{self, BoxFuture};
use futures::FutureExt;
use serde_json::Value;

use crate::errors::HookError;

pub type HookFuture<T> = BoxFuture<'static, Result<T, HookError>>;

type Handler<A, T> = dyn Fn(Option<A>) -> HookFuture<T> + Send + Sync;

/// A lifecycle callback.
///
/// Hooks receive the argument set matching their position in a round, or
/// `None` when the round supplied fewer argument sets than hooks.
pub struct Hook<A, T = Value> {
    handler: Arc<Handler<A, T>>,
}

impl<A, T> Clone for Hook<A, T> {
    fn clone(&self) -> Self {
        Self {
            handler: Arc::clone(&self.handler),
        }
    }
}

impl<A, T> fmt::Debug for Hook<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hook").finish_non_exhaustive()
    }
}

impl<A, T> Hook<A, T>
where
    A: Send + 'static,
    T: Send + 'static,
{
    /// Wrap an asynchronous hook.
    pub fn new<F, Fut>(hook: F) -> Self
    where
        F: Fn(Option<A>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, HookError>> + Send + 'static,
    {
        Self {
            handler: Arc::new(move |args| hook(args).boxed()),
        }
    }

    /// Wrap a hook that completes synchronously.
    pub fn from_fn<F>(hook: F) -> Self
    where
        F: Fn(Option<A>) -> Result<T, HookError> + Send + Sync + 'static,
    {
        Self {
            handler: Arc::new(move |args| future::ready(hook(args)).boxed()),
        }
    }

    /// Start the hook. Panics raised while calling it or while polling
    /// its future settle the returned future with [`HookError::Panicked`].
    pub(crate) fn invoke(&self, args: Option<A>) -> HookFuture<T> {
        let handler = Arc::clone(&self.handler);
        match panic::catch_unwind(AssertUnwindSafe(move || handler(args))) {
            Ok(pending) => AssertUnwindSafe(pending)
                .catch_unwind()
                .map(|settled| settled.unwrap_or_else(|payload| Err(HookError::from_panic(payload))))
                .boxed(),
            Err(payload) => future::ready(Err(HookError::from_panic(payload))).boxed(),
        }
    }
}

/// Hooks of one event, in registration order.
pub struct HookList<A, T = Value>(Vec<Hook<A, T>>);

impl<A, T> HookList<A, T> {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn push(&mut self, hook: Hook<A, T>) {
        self.0.push(hook);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Hook<A, T>> {
        self.0.iter()
    }
}

impl<A, T> Default for HookList<A, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<A, T> Clone for HookList<A, T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<A, T> fmt::Debug for HookList<A, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HookList").field(&self.0.len()).finish()
    }
}

impl<A, T> From<Hook<A, T>> for HookList<A, T> {
    fn from(hook: Hook<A, T>) -> Self {
        Self(vec![hook])
    }
}

impl<A, T> From<Vec<Hook<A, T>>> for HookList<A, T> {
    fn from(hooks: Vec<Hook<A, T>>) -> Self {
        Self(hooks)
    }
}

impl<A, T> From<&HookList<A, T>> for HookList<A, T> {
    fn from(hooks: &HookList<A, T>) -> Self {
        hooks.clone()
    }
}

/// Argument sets handed to the hooks of a round.
#[derive(Clone, Debug)]
pub enum HookArgs<A> {
    /// Hook `i` receives set `i`; hooks past the end receive nothing.
    Each(Vec<A>),
    /// Every hook receives its own copy of the same argument set.
    Broadcast(A),
}

impl<A: Clone> HookArgs<A> {
    pub fn none() -> Self {
        HookArgs::Each(Vec::new())
    }

    pub fn broadcast(args: A) -> Self {
        HookArgs::Broadcast(args)
    }

    pub(crate) fn for_hook(&self, index: usize) -> Option<A> {
        match self {
            HookArgs::Each(sets) => sets.get(index).cloned(),
            HookArgs::Broadcast(args) => Some(args.clone()),
        }
    }
}

impl<A> From<Vec<A>> for HookArgs<A> {
    fn from(sets: Vec<A>) -> Self {
        HookArgs::Each(sets)
    }
}
