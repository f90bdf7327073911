//! Error types for the Plugin API.
//!
//! Plugins and host collaborators return these; the engine turns them into
//! [`EngineError`](steward_core::EngineError) at the boundary.

use thiserror::Error;

/// Error returned by a plugin's input or enter handler.
#[derive(Debug, Error)]
pub enum PluginError {
    /// Plugin-specific failure.
    #[error("{0}")]
    Failed(String),

    /// A host operation the plugin relied on failed.
    #[error("Host error: {0}")]
    Host(#[from] HostError),

    /// Lua script error.
    #[error("Lua error: {0}")]
    Lua(String),

    /// Storage quota check rejected the write.
    #[error("Storage quota exceeded for '{0}'")]
    QuotaExceeded(String),
}

/// Error returned by a host collaborator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HostError {
    /// The operation ran and failed.
    #[error("{operation} failed: {message}")]
    Failed { operation: String, message: String },

    /// The host has no implementation for the operation.
    #[error("{0} is not supported by this host")]
    Unsupported(String),
}

impl HostError {
    pub fn failed(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            operation: operation.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for plugin handlers.
pub type PluginResult<T> = Result<T, PluginError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HostError::failed("write_clipboard", "no clipboard");
        assert_eq!(err.to_string(), "write_clipboard failed: no clipboard");

        let err: PluginError = err.into();
        assert_eq!(err.to_string(), "Host error: write_clipboard failed: no clipboard");
    }
}
