use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Retry budget of one command invocation.
///
/// `attempts` counts failed attempts that were followed by a retry and
/// never exceeds `limit`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub limit: u32,
    #[serde(default)]
    pub attempts: u32,
}

impl RetryPolicy {
    pub fn new(limit: u32) -> Self {
        Self { limit, attempts: 0 }
    }

    /// Policy that never retries.
    pub fn none() -> Self {
        Self::new(0)
    }

    pub fn can_retry(&self) -> bool {
        self.attempts < self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.attempts)
    }

    /// Same limit with the attempt counter cleared.
    pub fn fresh(&self) -> Self {
        Self::new(self.limit)
    }
}

/// Policy handle shared between the caller and an execution scope.
pub type SharedRetryPolicy = Arc<Mutex<RetryPolicy>>;
