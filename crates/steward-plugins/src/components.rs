//! Components manager.
//!
//! `show` lists hidden components, `hide` lists visible ones; entering an item
//! flips it and keeps the command open so the list refreshes.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use steward_core::{Command, CommandType, EngineError, KeyStatus, ResultItem};
use steward_plugin_api::{
    ensure_storage_safe, localized_commands, CommandSpec, EngineContext, EnterOutcome, Host,
    Plugin, PluginError, PluginMeta, PluginResult, RankKey, RankedMatcher,
};

const NAME: &str = "component";
const ICON: &str = "img/icon.png";

/// Storage key the visibility flags are written under.
const STORAGE_KEY: &str = "components";

/// A page component that can be shown or hidden.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub icon: Option<String>,
    pub show: bool,
}

impl Component {
    pub fn new(id: &str, title: &str, subtitle: &str, show: bool) -> Self {
        Self {
            id: id.to_string(),
            title: title.to_string(),
            subtitle: subtitle.to_string(),
            icon: None,
            show,
        }
    }

    fn to_item(&self) -> ResultItem {
        ResultItem::new("component", self.title.clone())
            .with_id(self.id.clone())
            .with_desc(self.subtitle.clone())
            .with_icon(self.icon.as_deref().unwrap_or(ICON))
    }
}

pub fn default_components() -> Vec<Component> {
    vec![
        Component::new("date", "Date", "Current date and time", true),
        Component::new("weather", "Weather", "Local forecast", true),
        Component::new("todo", "Todo", "Pending tasks", true),
        Component::new("quote", "Quote", "Quote of the day", false),
        Component::new("shortcuts", "Shortcuts", "Pinned sites", false),
    ]
}

pub struct ComponentManager {
    meta: PluginMeta,
    commands: Vec<Command>,
    components: RwLock<Vec<Component>>,
    ranker: RankedMatcher,
    host: Arc<dyn Host>,
}

impl ComponentManager {
    pub fn new(host: Arc<dyn Host>, ranker: RankedMatcher, components: Vec<Component>) -> Self {
        let commands = localized_commands(
            host.as_ref(),
            NAME,
            ICON,
            &[CommandSpec::new("show"), CommandSpec::new("hide")],
            CommandType::Keyword,
        );

        Self {
            meta: PluginMeta::new("Components Manager", 1)
                .with_category("other")
                .with_icon(ICON)
                .with_title(host.localized(&format!("{}_title", NAME), &[])),
            commands,
            components: RwLock::new(components),
            ranker,
            host,
        }
    }

    /// Current components, in display order.
    pub fn components(&self) -> Vec<Component> {
        self.components.read().clone()
    }
}

pub fn factory(ctx: &EngineContext) -> Arc<dyn Plugin> {
    Arc::new(ComponentManager::new(
        Arc::clone(ctx.host()),
        ctx.ranker().clone(),
        default_components(),
    ))
}

fn is_show(command: &Command) -> bool {
    command.original_key() == "show"
}

#[async_trait]
impl Plugin for ComponentManager {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn commands(&self) -> &[Command] {
        &self.commands
    }

    async fn on_input(
        &self,
        query: &str,
        command: &Command,
    ) -> PluginResult<Option<Vec<ResultItem>>> {
        let show = is_show(command);
        let items: Vec<ResultItem> = self
            .components
            .read()
            .iter()
            .filter(|c| c.show != show)
            .map(Component::to_item)
            .collect();

        if query.is_empty() {
            return Ok(Some(items));
        }
        Ok(Some(self.ranker.rank(items, query, Some(RankKey::Title))))
    }

    async fn on_enter(
        &self,
        item: &ResultItem,
        command: &Command,
        _query: &str,
        _key_status: &KeyStatus,
    ) -> PluginResult<EnterOutcome> {
        ensure_storage_safe(self.host.as_ref(), STORAGE_KEY)
            .await
            .map_err(|e| match e {
                EngineError::QuotaExceeded(key) => PluginError::QuotaExceeded(key),
                other => PluginError::Failed(other.to_string()),
            })?;

        let id = item
            .id
            .as_deref()
            .ok_or_else(|| PluginError::Failed("component item has no id".to_string()))?;
        let show = is_show(command);

        let mut components = self.components.write();
        let component = components
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| PluginError::Failed(format!("unknown component '{}'", id)))?;
        component.show = show;
        tracing::info!("Component '{}' is now {}", id, if show { "shown" } else { "hidden" });

        Ok(EnterOutcome::Keep)
    }
}
