//! Bootstrap error types

use contracts::ContractError;
use thiserror::Error;

/// Bootstrap specific error
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Script could not be loaded
    #[error("failed to load script '{url}': {message}")]
    ScriptLoadFailed { url: String, message: String },

    /// Transport rejected a bootstrap command
    #[error("failed to issue '{command}' command: {source}")]
    CommandFailed {
        command: &'static str,
        #[source]
        source: ContractError,
    },

    /// Wrapped ContractError
    #[error(transparent)]
    Contract(#[from] ContractError),
}

impl BootstrapError {
    /// Create script load error
    pub fn script_load(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ScriptLoadFailed {
            url: url.into(),
            message: message.into(),
        }
    }
}

/// Result alias
pub type Result<T> = std::result::Result<T, BootstrapError>;
