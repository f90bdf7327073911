//! Configuration types.
//!
//! Engine settings live in `config.toml`; Lua plugins live in `init.lua`
//! next to it.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Runtime configuration loaded from config.toml.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub general: GeneralConfig,

    /// Plugin names to skip at registration (only if the plugin can be disabled).
    #[serde(default)]
    pub disabled_plugins: Vec<String>,

    /// Custom keys for editable commands, keyed by `plugin:original_key`.
    #[serde(default)]
    pub command_keys: HashMap<String, String>,
}

/// General engine settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Debounce delay between the last keystroke and the matcher pass.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,

    /// Maximum number of items a batch execution acts on.
    #[serde(default = "default_max_operands")]
    pub max_operands: usize,
}

fn default_delay_ms() -> u64 {
    100
}

fn default_max_operands() -> usize {
    10
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
            max_operands: default_max_operands(),
        }
    }
}

impl AppConfig {
    /// Parse a config from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Load a config file. A missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml(&text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(e.to_string())),
        }
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&path)
    }
}

/// Get the config directory path.
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("steward"))
}

/// Get the path to config.toml.
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}

/// Get the path to init.lua.
pub fn init_lua_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("init.lua"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.general.delay_ms, 100);
        assert_eq!(config.general.max_operands, 10);
        assert!(config.disabled_plugins.is_empty());
    }

    #[test]
    fn test_parse_partial_toml() {
        let config = AppConfig::from_toml(
            r#"
            disabled_plugins = ["Chrome"]

            [general]
            max_operands = 3

            [command_keys]
            "Components Manager:show" = "sh"
            "#,
        )
        .unwrap();

        assert_eq!(config.general.max_operands, 3);
        assert_eq!(config.general.delay_ms, 100);
        assert_eq!(config.disabled_plugins, vec!["Chrome".to_string()]);
        assert_eq!(
            config.command_keys.get("Components Manager:show").map(String::as_str),
            Some("sh")
        );
    }

    #[test]
    fn test_parse_error() {
        let err = AppConfig::from_toml("general = 5").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config.general.delay_ms, 100);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[general]\ndelay_ms = 0").unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.general.delay_ms, 0);
    }
}
