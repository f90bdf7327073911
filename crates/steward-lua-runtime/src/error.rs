//! Lua runtime errors.

use std::time::Duration;

use steward_plugin_api::PluginError;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// A script or callback raised an error.
    #[error("Lua error: {0}")]
    Lua(String),

    #[error("Lua call timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// The runtime thread is gone.
    #[error("Lua runtime is not running")]
    Closed,

    /// A value could not cross the thread boundary.
    #[error("Lua value conversion failed: {0}")]
    Conversion(String),
}

impl From<mlua::Error> for RuntimeError {
    fn from(e: mlua::Error) -> Self {
        RuntimeError::Lua(e.to_string())
    }
}

impl From<RuntimeError> for PluginError {
    fn from(e: RuntimeError) -> Self {
        match e {
            RuntimeError::Lua(message) => PluginError::Lua(message),
            other => PluginError::Lua(other.to_string()),
        }
    }
}
