//! Hook rounds for command lifecycle events.
//!
//! A round invokes every registered hook without waiting on the others and
//! reports one [`HookOutcome`] per hook, in registration order. Failures are
//! captured as data so a single misbehaving hook never aborts the round.

pub mod errors;
pub mod hook;
pub mod outcome;
pub mod runner;

pub use errors::HookError;
pub use hook::{Hook, HookArgs, HookFuture, HookList};
pub use outcome::HookOutcome;
pub use runner::run_hooks;
