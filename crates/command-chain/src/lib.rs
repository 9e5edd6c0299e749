//! Command chaining engine.
//!
//! [`wrap_command`] turns a raw protocol command into a lifecycle-aware
//! command: `beforeCommand`/`afterCommand` hooks fire around every outer
//! call, scope-attached retry policies are honoured, and the result comes
//! back as a [`Deferred`] that can be chained, indexed and iterated before
//! the underlying call has settled.

pub mod command;
pub mod deferred;
pub mod errors;
pub mod events;
pub mod scope;
pub mod value;

pub use command::{wrap_command, CommandCall, RawCommand, WrappedCommand};
pub use deferred::{ChainedMethod, Deferred};
pub use errors::CommandError;
pub use events::{AfterCommandEvent, AfterCommandHook, BeforeCommandHook, CommandEvent};
pub use scope::{ExecutionScope, ScopeBuilder, ScopeOptions};
pub use value::{ChainTarget, CommandCatalog, RemoteObject, Resolved};

pub use shim_hooks::{Hook, HookError, HookOutcome};
pub use shim_retry::{RetryPolicy, SharedRetryPolicy};
