//! Error types for the PlayTag environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// A spawned task panicked or was aborted
    #[error("Task '{name}' failed: {reason}")]
    TaskFailed { name: String, reason: String },

    /// Installing an OS signal handler failed
    #[error("Signal handler error: {0}")]
    SignalError(String),
}

impl EnvError {
    /// Creates a task failure error.
    pub fn task(name: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::TaskFailed {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    /// Creates a signal handler error.
    pub fn signal(reason: impl std::fmt::Display) -> Self {
        Self::SignalError(reason.to_string())
    }
}
