//! Dispatcher error types

use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Link creation error
    #[error("failed to create link '{name}': {message}")]
    LinkCreation { name: String, message: String },

    /// Link topology mismatch against the configured worker grid
    #[error("expected {expected} worker links, got {got}")]
    LinkCount { expected: usize, got: usize },

    /// Link transport error (from contract)
    #[error("link error: {0}")]
    Contract(#[from] contracts::ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a link creation error
    pub fn link_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}
