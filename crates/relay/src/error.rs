//! Relay error types

use thiserror::Error;

/// Errors raised while installing the relay
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration rejected
    #[error("invalid relay config: {0}")]
    Config(#[from] contracts::ContractError),

    /// Data layer could not be intercepted
    #[error(transparent)]
    EventBus(#[from] event_bus::EventBusError),
}

/// Result alias
pub type Result<T> = std::result::Result<T, RelayError>;
