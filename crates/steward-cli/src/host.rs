//! Terminal host: prints what a browser host would do.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;
use steward_plugin_api::{fill_template, Host, HostError, OpenTarget};

/// English messages for the built-in plugins. `{{1}}`, `{{2}}`... are
/// positional substitutions.
const MESSAGES: &[(&str, &str)] = &[
    ("calculate_title", "Calculator"),
    ("calculate_subtitle", "Press enter to copy the result"),
    ("chrome_title", "Chrome pages"),
    ("component_title", "Components"),
    ("component_show_title", "Show component"),
    ("component_show_subtitle", "Show a hidden component"),
    ("component_hide_title", "Hide component"),
    ("component_hide_subtitle", "Hide a visible component"),
];

#[derive(Debug, Default)]
pub struct ConsoleHost {
    clipboard: Mutex<Option<String>>,
}

impl ConsoleHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last text written to the clipboard.
    pub fn clipboard(&self) -> Option<String> {
        self.clipboard.lock().clone()
    }
}

#[async_trait]
impl Host for ConsoleHost {
    async fn open_tab(&self, url: &str, target: OpenTarget) -> Result<(), HostError> {
        match target {
            OpenTarget::CurrentTab => println!("-> open {} (current tab)", url),
            OpenTarget::NewTab { active: true } => println!("-> open {}", url),
            OpenTarget::NewTab { active: false } => println!("-> open {} (background)", url),
        }
        Ok(())
    }

    async fn write_clipboard(&self, text: &str) -> Result<(), HostError> {
        println!("-> copied {}", text);
        *self.clipboard.lock() = Some(text.to_string());
        Ok(())
    }

    async fn send_runtime_message(&self, action: &str) -> Result<serde_json::Value, HostError> {
        tracing::debug!("Runtime message '{}' has no receiver", action);
        Err(HostError::Unsupported(format!("runtime message '{}'", action)))
    }

    async fn storage_quota_check(&self, _key: &str) -> Result<bool, HostError> {
        Ok(true)
    }

    fn localized(&self, key: &str, substitutions: &[String]) -> String {
        let Some((_, template)) = MESSAGES.iter().find(|(k, _)| *k == key) else {
            return String::new();
        };

        let positions: Vec<String> = (1..=substitutions.len()).map(|i| i.to_string()).collect();
        let data: HashMap<&str, String> = positions
            .iter()
            .map(String::as_str)
            .zip(substitutions.iter().cloned())
            .collect();
        fill_template(template, &data)
    }
}
