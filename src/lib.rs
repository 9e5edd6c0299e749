//! Command shim
//!
//! Wraps automation commands with lifecycle hooks, scope-level retry
//! budgets and chainable deferred results. The building blocks live in
//! the workspace crates re-exported here; this crate adds configuration,
//! the command log hooks and an in-memory fixture page.

pub mod command_log;
pub mod config;
pub mod demo;
pub mod fixture;

pub use config::{ConfigError, HooksConfig, RetryConfig, ShimConfig};
pub use demo::{demo_scope, run_demo, DemoReport};

pub use shim_chain as chain;
pub use shim_core_types as types;
pub use shim_hooks as hooks;
pub use shim_retry as retry;
