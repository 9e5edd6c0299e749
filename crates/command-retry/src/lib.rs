//! Retry execution for command invocations.
//!
//! [`execute_with_retry`] re-runs a failing operation while the caller's
//! [`RetryPolicy`] has budget left, mutating the policy and the scope's
//! retry counter so both can be inspected once the call settles.

pub mod executor;
pub mod policy;

pub use executor::{execute_with_retry, RetryScope};
pub use policy::{RetryPolicy, SharedRetryPolicy};
