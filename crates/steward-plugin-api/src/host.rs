//! Host collaborators.
//!
//! Low-level host operations (tabs, clipboard, runtime messaging, storage
//! quota, localized strings) are reached only through the [`Host`] trait.
//! Every operation returns a `Result` rather than taking a callback.

use std::collections::HashMap;

use async_trait::async_trait;
use steward_core::{Command, CommandType, EngineError, KeyStatus};

use crate::error::HostError;

/// Where a URL should be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenTarget {
    /// Create a new tab.
    NewTab { active: bool },
    /// Navigate the current tab.
    CurrentTab,
}

/// Narrow async host operations consumed by plugins.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Host: Send + Sync {
    /// Open a URL, or focus an existing tab showing it.
    async fn open_tab(&self, url: &str, target: OpenTarget) -> Result<(), HostError>;

    async fn write_clipboard(&self, text: &str) -> Result<(), HostError>;

    /// Send an action to the host runtime and return its data.
    async fn send_runtime_message(&self, action: &str) -> Result<serde_json::Value, HostError>;

    /// Whether writing `key` is within the storage quota.
    async fn storage_quota_check(&self, key: &str) -> Result<bool, HostError>;

    /// Look up a localized message. Returns an empty string when unknown.
    fn localized(&self, key: &str, substitutions: &[String]) -> String;
}

/// Open a selected item's URL, honoring modifier keys.
///
/// Holding meta navigates the current tab; otherwise a new tab is opened.
pub async fn open_item(host: &dyn Host, url: &str, key_status: &KeyStatus) -> Result<(), HostError> {
    let target = if key_status.meta_key {
        OpenTarget::CurrentTab
    } else {
        OpenTarget::NewTab { active: true }
    };
    tracing::debug!("open {} ({:?})", url, target);
    host.open_tab(url, target).await
}

/// Open a URL in a background tab. Used for each element of a batch.
pub async fn open_in_background(host: &dyn Host, url: &str) -> Result<(), HostError> {
    tracing::debug!("open {} in background", url);
    host.open_tab(url, OpenTarget::NewTab { active: false }).await
}

/// Fail with `QuotaExceeded` unless `key` may be written.
pub async fn ensure_storage_safe(host: &dyn Host, key: &str) -> Result<(), EngineError> {
    if key.is_empty() {
        return Err(EngineError::QuotaExceeded(key.to_string()));
    }

    match host.storage_quota_check(key).await {
        Ok(true) => Ok(()),
        Ok(false) => {
            tracing::warn!("Storage quota check failed for '{}'", key);
            Err(EngineError::QuotaExceeded(key.to_string()))
        }
        Err(e) => Err(EngineError::Host(e.to_string())),
    }
}

/// Replace `{{name}}` placeholders with values from `data`.
///
/// Unknown names are replaced with an empty string. Names are restricted to
/// ASCII letters, digits and `_`; anything else is left untouched.
pub fn fill_template(template: &str, data: &HashMap<&str, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];

        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let name = &after[..end];
        if !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            if let Some(value) = data.get(name) {
                out.push_str(value);
            }
        } else {
            out.push_str(&rest[start..start + 2 + end + 2]);
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

/// A command declaration whose titles come from localized messages.
#[derive(Debug, Clone, Default)]
pub struct CommandSpec {
    pub key: String,
    /// Message key to use instead of `key`.
    pub keyname: Option<String>,
    pub editable: Option<bool>,
    pub allow_batch: bool,
    pub shift_key: bool,
    pub workflow: bool,
    pub weight: Option<i32>,
}

impl CommandSpec {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }
}

/// Build commands with titles from `{plugin}_{key}_title` / `_subtitle` messages.
pub fn localized_commands(
    host: &dyn Host,
    plugin: &str,
    icon: &str,
    specs: &[CommandSpec],
    command_type: CommandType,
) -> Vec<Command> {
    specs
        .iter()
        .map(|spec| {
            let name = spec.keyname.as_deref().unwrap_or(&spec.key);
            let mut command = Command::new(spec.key.clone(), command_type)
                .with_title(host.localized(&format!("{}_{}_title", plugin, name), &[]))
                .with_subtitle(host.localized(&format!("{}_{}_subtitle", plugin, name), &[]))
                .with_icon(icon)
                .with_editable(spec.editable != Some(false))
                .with_batch(spec.allow_batch)
                .with_shift_key(spec.shift_key)
                .with_workflow(spec.workflow);
            command.weight = spec.weight;
            command
        })
        .collect()
}

/// A host that does nothing and reports every operation as unsupported.
///
/// Useful for headless runs and for plugins that never touch the host.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullHost;

#[async_trait]
impl Host for NullHost {
    async fn open_tab(&self, _url: &str, _target: OpenTarget) -> Result<(), HostError> {
        Err(HostError::Unsupported("open_tab".to_string()))
    }

    async fn write_clipboard(&self, _text: &str) -> Result<(), HostError> {
        Err(HostError::Unsupported("write_clipboard".to_string()))
    }

    async fn send_runtime_message(&self, _action: &str) -> Result<serde_json::Value, HostError> {
        Err(HostError::Unsupported("send_runtime_message".to_string()))
    }

    async fn storage_quota_check(&self, _key: &str) -> Result<bool, HostError> {
        Ok(true)
    }

    fn localized(&self, _key: &str, _substitutions: &[String]) -> String {
        String::new()
    }
}
