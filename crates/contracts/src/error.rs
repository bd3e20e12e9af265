//! Layered error definitions
//!
//! Categorized by source: config / channel / capture / delay / link.
//! Missing data is never an error: gaps travel as `GapSet` content in
//! metadata. Only broken preconditions and transports surface here.

use thiserror::Error;

use crate::delay::DelayError;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Channel Errors =====
    /// Read window larger than the channel can serve
    #[error("read window of {requested} samples exceeds channel maximum of {max}")]
    WindowTooLarge { requested: usize, max: usize },

    // ===== Capture Errors =====
    /// Capture transport failure (fatal to one capture worker)
    #[error("capture transport failure on stream '{stream}': {message}")]
    CaptureTransport { stream: String, message: String },

    // ===== Delay Errors =====
    /// Delay oracle failure
    #[error("delay error: {0}")]
    Delay(#[from] DelayError),

    // ===== Link Errors =====
    /// Worker link write error
    #[error("link '{link}' write error: {message}")]
    LinkWrite { link: String, message: String },

    /// Worker link connection error
    #[error("link '{link}' connection error: {message}")]
    LinkConnection { link: String, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create capture transport error
    pub fn capture_transport(stream: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CaptureTransport {
            stream: stream.into(),
            message: message.into(),
        }
    }

    /// Create worker link write error
    pub fn link_write(link: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LinkWrite {
            link: link.into(),
            message: message.into(),
        }
    }

    /// Create worker link connection error
    pub fn link_connection(link: impl Into<String>, message: impl Into<String>) -> Self {
        Self::LinkConnection {
            link: link.into(),
            message: message.into(),
        }
    }
}
