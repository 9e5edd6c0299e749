use std::fmt;
use std::future::Future;

use tracing::{debug, info, warn};

use crate::policy::RetryPolicy;

/// Scope that keeps a running total of retries across calls.
pub trait RetryScope: Send + Sync {
    /// Record one retry and return the new total.
    fn record_retry(&self) -> u32;
}

/// Run `operation` with `args`, retrying failures while `policy` has budget.
///
/// Each failure that is followed by a retry bumps `policy.attempts` and the
/// scope's retry total. Once the budget is spent the last failure is
/// returned unchanged. Successful calls never touch the policy.
pub async fn execute_with_retry<S, F, Fut, A, T, E>(
    scope: &S,
    mut operation: F,
    policy: &mut RetryPolicy,
    args: A,
) -> Result<T, E>
where
    S: RetryScope + ?Sized,
    F: FnMut(A) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    A: Clone,
    E: fmt::Display,
{
    loop {
        match operation(args.clone()).await {
            Ok(value) => {
                if policy.attempts > 0 {
                    info!(attempts = policy.attempts, "operation succeeded after retries");
                }
                return Ok(value);
            }
            Err(err) if policy.can_retry() => {
                policy.attempts += 1;
                let total = scope.record_retry();
                warn!(
                    attempt = policy.attempts,
                    limit = policy.limit,
                    total,
                    error = %err,
                    "operation failed, retrying"
                );
            }
            Err(err) => {
                if policy.limit > 0 {
                    warn!(limit = policy.limit, error = %err, "retry budget exhausted");
                } else {
                    debug!(error = %err, "operation failed without retry budget");
                }
                return Err(err);
            }
        }
    }
}
