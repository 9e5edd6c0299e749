use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use shim_core_types::SessionId;
use shim_hooks::HookList;
use shim_retry::{RetryPolicy, RetryScope, SharedRetryPolicy};

use crate::events::{AfterCommandEvent, AfterCommandHook, BeforeCommandHook, CommandEvent};

/// Hook lists of a scope. Empty lists mean no round runs.
#[derive(Clone, Debug, Default)]
pub struct ScopeOptions {
    pub before_command: HookList<CommandEvent>,
    pub after_command: HookList<AfterCommandEvent>,
}

/// Invocation context shared by every wrapped command of one session.
///
/// Tracks how many lifecycle hook rounds are in flight (commands started
/// while one is open skip their own hooks), the running retry total, and
/// the retry policies attached to individual commands.
pub struct ExecutionScope {
    session: SessionId,
    options: ScopeOptions,
    hook_depth: AtomicUsize,
    retries: Mutex<Option<u32>>,
    retry_policies: DashMap<String, SharedRetryPolicy>,
}

impl ExecutionScope {
    pub fn new(options: ScopeOptions) -> Arc<Self> {
        Self::builder().options(options).build()
    }

    pub fn builder() -> ScopeBuilder {
        ScopeBuilder::default()
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    pub fn options(&self) -> &ScopeOptions {
        &self.options
    }

    /// Number of hook rounds currently open on this scope.
    pub fn hook_depth(&self) -> usize {
        self.hook_depth.load(Ordering::SeqCst)
    }

    /// Retries performed through this scope so far; `None` until the first one.
    pub fn retries(&self) -> Option<u32> {
        *self.retries.lock()
    }

    /// Attach a retry policy to `command`, replacing any previous one.
    ///
    /// The returned handle reflects the attempts consumed by the most
    /// recently settled invocation of that command.
    pub fn attach_retry_policy(
        &self,
        command: impl Into<String>,
        policy: RetryPolicy,
    ) -> SharedRetryPolicy {
        let shared = Arc::new(Mutex::new(policy));
        self.retry_policies
            .insert(command.into(), Arc::clone(&shared));
        shared
    }

    pub fn detach_retry_policy(&self, command: &str) -> Option<SharedRetryPolicy> {
        self.retry_policies.remove(command).map(|(_, policy)| policy)
    }

    pub fn retry_policy(&self, command: &str) -> Option<SharedRetryPolicy> {
        self.retry_policies
            .get(command)
            .map(|entry| Arc::clone(entry.value()))
    }

    pub(crate) fn enter_hook_window(&self) -> HookWindow<'_> {
        self.hook_depth.fetch_add(1, Ordering::SeqCst);
        HookWindow {
            depth: &self.hook_depth,
        }
    }
}

impl RetryScope for ExecutionScope {
    fn record_retry(&self) -> u32 {
        let mut retries = self.retries.lock();
        let total = retries.unwrap_or(0) + 1;
        *retries = Some(total);
        total
    }
}

impl fmt::Debug for ExecutionScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExecutionScope")
            .field("session", &self.session)
            .field("hook_depth", &self.hook_depth())
            .field("retries", &self.retries())
            .field("before_command", &self.options.before_command.len())
            .field("after_command", &self.options.after_command.len())
            .finish()
    }
}

/// Open hook round. Dropping it closes the round on every exit path,
/// including unwinding and cancellation.
pub(crate) struct HookWindow<'a> {
    depth: &'a AtomicUsize,
}

impl Drop for HookWindow<'_> {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct ScopeBuilder {
    session: Option<SessionId>,
    options: ScopeOptions,
    retry_policies: Vec<(String, RetryPolicy)>,
}

impl ScopeBuilder {
    pub fn session(mut self, session: SessionId) -> Self {
        self.session = Some(session);
        self
    }

    pub fn options(mut self, options: ScopeOptions) -> Self {
        self.options = options;
        self
    }

    pub fn before_command(mut self, hook: BeforeCommandHook) -> Self {
        self.options.before_command.push(hook);
        self
    }

    pub fn after_command(mut self, hook: AfterCommandHook) -> Self {
        self.options.after_command.push(hook);
        self
    }

    pub fn retry(mut self, command: impl Into<String>, policy: RetryPolicy) -> Self {
        self.retry_policies.push((command.into(), policy));
        self
    }

    pub fn build(self) -> Arc<ExecutionScope> {
        let scope = ExecutionScope {
            session: self.session.unwrap_or_default(),
            options: self.options,
            hook_depth: AtomicUsize::new(0),
            retries: Mutex::new(None),
            retry_policies: DashMap::new(),
        };
        for (command, policy) in self.retry_policies {
            scope.attach_retry_policy(command, policy);
        }
        Arc::new(scope)
    }
}
