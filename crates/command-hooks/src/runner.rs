use futures::future::join_all;
use tracing::{debug_span, Instrument};

use crate::hook::{HookArgs, HookList};
use crate::outcome::HookOutcome;

/// Run every hook of `event` concurrently and collect their outcomes.
///
/// Hooks are started in list order without awaiting one another. The
/// returned outcomes follow registration order, not completion order, and
/// the round never fails: errors and panics are reported per hook.
pub async fn run_hooks<A, T>(
    event: &str,
    hooks: impl Into<HookList<A, T>>,
    args: impl Into<HookArgs<A>>,
) -> Vec<HookOutcome<T>>
where
    A: Clone + Send + 'static,
    T: Send + 'static,
{
    let hooks = hooks.into();
    let args = args.into();
    if hooks.is_empty() {
        return Vec::new();
    }

    let pending: Vec<_> = hooks
        .iter()
        .enumerate()
        .map(|(index, hook)| hook.invoke(args.for_hook(index)))
        .collect();

    join_all(pending)
        .instrument(debug_span!("hook_round", event, hooks = hooks.len()))
        .await
        .into_iter()
        .map(HookOutcome::from)
        .collect()
}
