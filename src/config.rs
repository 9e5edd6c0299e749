//! Shim configuration
//!
//! YAML document that decides which commands get a retry budget and
//! whether the built-in command log hooks are installed on a scope.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shim_chain::{RetryPolicy, ScopeBuilder};
use thiserror::Error;

use crate::command_log;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("retry.commands contains an empty command name")]
    EmptyCommandName,

    #[error("retry limit {limit} for `{command}` exceeds the maximum of {max}")]
    LimitTooLarge { command: String, limit: u32, max: u32 },
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShimConfig {
    pub retry: RetryConfig,
    pub hooks: HooksConfig,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Budget for commands not listed in `commands`; 0 disables retries.
    pub default_limit: u32,
    pub commands: BTreeMap<String, u32>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Trace every command through a beforeCommand/afterCommand hook pair.
    pub log_commands: bool,
}

impl ShimConfig {
    pub const MAX_RETRY_LIMIT: u32 = 100;

    pub fn from_yaml(raw: &str) -> Result<Self, ConfigError> {
        let config: ShimConfig = serde_yaml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let limits = self
            .retry
            .commands
            .iter()
            .map(|(command, limit)| (command.as_str(), *limit))
            .chain(std::iter::once(("<default>", self.retry.default_limit)));
        for (command, limit) in limits {
            if command.trim().is_empty() {
                return Err(ConfigError::EmptyCommandName);
            }
            if limit > Self::MAX_RETRY_LIMIT {
                return Err(ConfigError::LimitTooLarge {
                    command: command.to_string(),
                    limit,
                    max: Self::MAX_RETRY_LIMIT,
                });
            }
        }
        Ok(())
    }

    /// Retry budget of `command`.
    pub fn limit_for(&self, command: &str) -> u32 {
        self.retry
            .commands
            .get(command)
            .copied()
            .unwrap_or(self.retry.default_limit)
    }

    /// Install the configured retry policies and hooks on `builder`.
    pub fn apply(&self, builder: ScopeBuilder) -> ScopeBuilder {
        let builder = self
            .retry
            .commands
            .iter()
            .filter(|(_, limit)| **limit > 0)
            .fold(builder, |builder, (command, limit)| {
                builder.retry(command.clone(), RetryPolicy::new(*limit))
            });
        if self.hooks.log_commands {
            builder
                .before_command(command_log::before_hook())
                .after_command(command_log::after_hook())
        } else {
            builder
        }
    }

    /// Like [`apply`](Self::apply), and also gives every command in
    /// `commands` without an explicit entry the default budget.
    pub fn apply_with_defaults<'a>(
        &self,
        builder: ScopeBuilder,
        commands: impl IntoIterator<Item = &'a str>,
    ) -> ScopeBuilder {
        let default_limit = self.retry.default_limit;
        let builder = if default_limit == 0 {
            builder
        } else {
            commands
                .into_iter()
                .filter(|command| !self.retry.commands.contains_key(*command))
                .fold(builder, |builder, command| {
                    builder.retry(command, RetryPolicy::new(default_limit))
                })
        };
        self.apply(builder)
    }
}
