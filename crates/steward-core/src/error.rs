//! Error types for the Steward launcher.

use thiserror::Error;

/// Registration-time errors. These are fatal to startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Two commands share the same `(plugin, key)` identity.
    #[error("Duplicate command '{key}' in plugin '{plugin}'")]
    DuplicateCommand { plugin: String, key: String },

    /// The plugin does not satisfy the plugin contract.
    #[error("Invalid plugin '{plugin}': {reason}")]
    InvalidPlugin { plugin: String, reason: String },
}

/// Engine errors - surfaced to the UI or the caller.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A plugin's input handler failed. Logged and isolated.
    #[error("Plugin '{plugin}' input failed: {message}")]
    PluginInput { plugin: String, message: String },

    /// A plugin's enter handler failed.
    #[error("Plugin '{plugin}' execution failed: {message}")]
    PluginExecution { plugin: String, message: String },

    /// Storage quota check failed for the given key.
    #[error("Storage quota exceeded for '{0}'")]
    QuotaExceeded(String),

    /// A host operation failed.
    #[error("Host error: {0}")]
    Host(String),

    /// Nothing selectable at the given index.
    #[error("No result at index {0}")]
    NoSelection(usize),

    /// The engine is not in a state that accepts the operation.
    #[error("Engine not ready: {0}")]
    NotReady(String),
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config directory found.
    #[error("Config directory not found")]
    NoConfigDir,

    /// IO error.
    #[error("IO error: {0}")]
    Io(String),

    /// Parse error.
    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RegistryError::DuplicateCommand {
            plugin: "Calculator".to_string(),
            key: "calc".to_string(),
        };
        assert_eq!(err.to_string(), "Duplicate command 'calc' in plugin 'Calculator'");

        let err = EngineError::QuotaExceeded("wallpapers".to_string());
        assert_eq!(err.to_string(), "Storage quota exceeded for 'wallpapers'");
    }
}
