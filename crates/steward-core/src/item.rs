//! Result items and selection modifiers.

use serde::{Deserialize, Serialize};

use crate::command::Command;

/// A candidate produced by a plugin's input handler.
///
/// `weight` is assigned by the producing plugin and only ever read by the
/// engine: it breaks ties between equal fuzzy scores, lower first.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultItem {
    /// Plugin-defined item kind (e.g. "copy", "url").
    #[serde(default)]
    pub key: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default)]
    pub icon: String,

    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub desc: Option<String>,

    #[serde(default)]
    pub weight: i32,

    /// Placeholder shown when a command has nothing to offer.
    #[serde(default)]
    pub is_default: bool,

    #[serde(default)]
    pub universal: bool,

    /// Arbitrary data for `on_enter` to consume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<serde_json::Value>,
}

impl ResultItem {
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_desc(mut self, desc: impl Into<String>) -> Self {
        self.desc = Some(desc.into());
        self
    }

    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = weight;
        self
    }

    pub fn with_content(mut self, content: serde_json::Value) -> Self {
        self.content = Some(content);
        self
    }

    /// The placeholder item shown for a command with no results.
    pub fn default_for(command: &Command) -> Self {
        Self {
            icon: command.icon.clone(),
            title: command.title.clone(),
            desc: Some(command.subtitle.clone()),
            is_default: true,
            ..Default::default()
        }
    }

    /// Read `content` as a string, falling back to the title.
    pub fn content_text(&self) -> &str {
        self.content
            .as_ref()
            .and_then(|c| c.as_str())
            .unwrap_or(&self.title)
    }
}

/// Modifier keys held at the moment of selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct KeyStatus {
    #[serde(default)]
    pub meta_key: bool,
    #[serde(default)]
    pub shift_key: bool,
    #[serde(default)]
    pub ctrl_key: bool,
    #[serde(default)]
    pub alt_key: bool,
}

impl KeyStatus {
    pub fn shift() -> Self {
        Self {
            shift_key: true,
            ..Default::default()
        }
    }

    pub fn meta() -> Self {
        Self {
            meta_key: true,
            ..Default::default()
        }
    }
}
