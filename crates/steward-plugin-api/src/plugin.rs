//! The plugin contract.
//!
//! A plugin owns its commands and two handlers: `on_input` produces candidates
//! for the active command, `on_enter` acts on a selected candidate. Plugins are
//! built by factories that receive the [`EngineContext`] instead of reaching
//! for global state.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use steward_core::{Command, KeyStatus, ResultItem};

use crate::context::EngineContext;
use crate::error::PluginResult;

/// Descriptive plugin metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginMeta {
    pub version: u32,

    /// Unique plugin name. Command identity is `(name, key)`.
    pub name: String,

    #[serde(default)]
    pub category: String,

    #[serde(default)]
    pub icon: String,

    #[serde(default)]
    pub title: String,

    /// Whether users may turn this plugin off in config.
    #[serde(default)]
    pub can_disabled: bool,
}

impl PluginMeta {
    pub fn new(name: impl Into<String>, version: u32) -> Self {
        Self {
            version,
            name: name.into(),
            category: String::new(),
            icon: String::new(),
            title: String::new(),
            can_disabled: false,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_can_disabled(mut self, can_disabled: bool) -> Self {
        self.can_disabled = can_disabled;
        self
    }
}

/// What a plugin wants to happen after `on_enter`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnterOutcome {
    /// The interaction is finished; the engine returns to idle.
    Done,

    /// Stay on the current command and refresh its results.
    Keep,

    /// Chain into the command named by this input text (e.g. `"calc "`).
    Workflow(String),
}

/// A plugin as seen by the engine.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn meta(&self) -> &PluginMeta;

    fn commands(&self) -> &[Command];

    /// Whether an `always` command claims this raw input.
    ///
    /// Awaited in declaration order on every resolution, before any
    /// `on_input` runs, so it sits on the keystroke path.
    async fn accepts(&self, _command: &Command, _input: &str) -> bool {
        true
    }

    /// Produce candidates. `Ok(None)` means "nothing to contribute".
    async fn on_input(&self, query: &str, command: &Command)
        -> PluginResult<Option<Vec<ResultItem>>>;

    /// Act on a selected candidate. Called exactly once per selection event
    /// (or once per element in a batch).
    async fn on_enter(
        &self,
        item: &ResultItem,
        command: &Command,
        query: &str,
        key_status: &KeyStatus,
    ) -> PluginResult<EnterOutcome>;
}

/// Builds a plugin from the engine context.
pub type PluginFactory = fn(&EngineContext) -> Arc<dyn Plugin>;
