//! Command types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a command is matched against user input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandType {
    /// Only active when the leading input token equals the command key.
    Keyword,
    /// Consulted on every keystroke, regardless of prefix.
    Always,
    /// Consulted when no keyword or always command claims the input.
    Search,
}

impl CommandType {
    /// Parse the lowercase name used in plugin definitions.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "keyword" => Some(Self::Keyword),
            "always" => Some(Self::Always),
            "search" => Some(Self::Search),
            _ => None,
        }
    }
}

/// A named, typed unit of functionality declared by a plugin.
///
/// Commands are immutable once registered. `key` is what the user types,
/// `orkey` keeps the original identity when `key` has been remapped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orkey: Option<String>,

    #[serde(rename = "type")]
    pub command_type: CommandType,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub subtitle: String,

    #[serde(default)]
    pub icon: String,

    #[serde(default = "default_editable")]
    pub editable: bool,

    /// Whether the command supports acting on several items at once.
    #[serde(default)]
    pub allow_batch: bool,

    /// Whether holding shift switches the command into batch mode.
    #[serde(default)]
    pub shift_key: bool,

    #[serde(default)]
    pub workflow: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<i32>,
}

fn default_editable() -> bool {
    true
}

impl Command {
    /// Create a command with the given key and type.
    pub fn new(key: impl Into<String>, command_type: CommandType) -> Self {
        let key = key.into();
        Self {
            orkey: Some(key.clone()),
            key,
            command_type,
            title: String::new(),
            subtitle: String::new(),
            icon: String::new(),
            editable: true,
            allow_batch: false,
            shift_key: false,
            workflow: false,
            weight: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    pub fn with_batch(mut self, allow_batch: bool) -> Self {
        self.allow_batch = allow_batch;
        self
    }

    pub fn with_shift_key(mut self, shift_key: bool) -> Self {
        self.shift_key = shift_key;
        self
    }

    pub fn with_workflow(mut self, workflow: bool) -> Self {
        self.workflow = workflow;
        self
    }

    /// The pre-remapping identity of this command.
    pub fn original_key(&self) -> &str {
        self.orkey.as_deref().unwrap_or(&self.key)
    }

    /// Whether `token` names this command by key or original key.
    pub fn is_named(&self, token: &str) -> bool {
        self.key == token || self.orkey.as_deref() == Some(token)
    }

    /// Whether this command can fan out over several items.
    pub fn supports_batch(&self) -> bool {
        self.allow_batch || self.shift_key
    }
}

/// Serialized reference to a registered command.
///
/// Formatted as `plugin:original_key`. This is what the workflow stack holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CommandRef(pub String);

impl CommandRef {
    pub fn new(plugin: &str, command: &Command) -> Self {
        Self(format!("{}:{}", plugin, command.original_key()))
    }
}

impl fmt::Display for CommandRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CommandRef {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_named_by_key_or_orkey() {
        let mut cmd = Command::new("show", CommandType::Keyword);
        cmd.key = "sh".to_string();

        assert!(cmd.is_named("sh"));
        assert!(cmd.is_named("show"));
        assert!(!cmd.is_named("Show"));
        assert_eq!(cmd.original_key(), "show");
    }

    #[test]
    fn test_command_ref_uses_original_key() {
        let mut cmd = Command::new("show", CommandType::Keyword);
        cmd.key = "sh".to_string();

        let r = CommandRef::new("Components Manager", &cmd);
        assert_eq!(r.to_string(), "Components Manager:show");
    }

    #[test]
    fn test_command_deserialize_defaults() {
        let cmd: Command = serde_json::from_str(r#"{"key":"calc","type":"always"}"#).unwrap();
        assert_eq!(cmd.command_type, CommandType::Always);
        assert!(cmd.editable);
        assert!(!cmd.allow_batch);
        assert!(cmd.orkey.is_none());
        assert_eq!(cmd.original_key(), "calc");
    }
}
