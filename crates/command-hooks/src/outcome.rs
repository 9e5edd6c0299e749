use crate::errors::HookError;

/// Result of one hook within a round: its value, or the failure it raised.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome<T> {
    Completed(T),
    Failed(HookError),
}

impl<T> HookOutcome<T> {
    pub fn is_failed(&self) -> bool {
        matches!(self, HookOutcome::Failed(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            HookOutcome::Completed(value) => Some(value),
            HookOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&HookError> {
        match self {
            HookOutcome::Completed(_) => None,
            HookOutcome::Failed(err) => Some(err),
        }
    }

    pub fn into_result(self) -> Result<T, HookError> {
        match self {
            HookOutcome::Completed(value) => Ok(value),
            HookOutcome::Failed(err) => Err(err),
        }
    }
}

impl<T> From<Result<T, HookError>> for HookOutcome<T> {
    fn from(result: Result<T, HookError>) -> Self {
        match result {
            Ok(value) => HookOutcome::Completed(value),
            Err(err) => HookOutcome::Failed(err),
        }
    }
}
