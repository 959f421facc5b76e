//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Deferred flush could not be started
    #[error("scheduler '{scheduler}' unavailable: {message}")]
    SchedulerUnavailable { scheduler: String, message: String },

    /// Transport error (from contract)
    #[error("transport error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a scheduler error
    pub fn scheduler_unavailable(scheduler: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SchedulerUnavailable {
            scheduler: scheduler.into(),
            message: message.into(),
        }
    }
}
