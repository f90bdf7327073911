//! Command matching.
//!
//! Decides which command is active for a raw input and collects its
//! candidates:
//!
//! ```text
//! raw input ──► leading token names a keyword? ──yes──► Keyword (query = rest)
//!                        │no
//!                        ▼
//!              an always plugin accepts it? ──yes──► Always (query = raw)
//!                        │no
//!                        ▼
//!              every search plugin, merged and re-ordered
//! ```
//!
//! A plugin whose `on_input` fails or returns nothing contributes zero items;
//! the failure never reaches the caller.

use std::sync::Arc;

use futures::future::join_all;
use steward_core::{EngineError, ResultItem};

use crate::ranking::{RankKey, Rankable, RankedMatcher};
use crate::registry::{PluginRegistry, RegisteredCommand};

/// Which command an input resolves to, before any plugin is called.
#[derive(Debug, Clone)]
pub enum Resolution {
    /// Nothing typed.
    Empty,
    Keyword {
        command: Arc<RegisteredCommand>,
        query: String,
    },
    Always {
        command: Arc<RegisteredCommand>,
        query: String,
    },
    Search {
        commands: Vec<Arc<RegisteredCommand>>,
        query: String,
    },
}

impl Resolution {
    /// The active command. For a search fallback this is the first search command.
    pub fn command(&self) -> Option<&Arc<RegisteredCommand>> {
        match self {
            Resolution::Empty => None,
            Resolution::Keyword { command, .. } | Resolution::Always { command, .. } => Some(command),
            Resolution::Search { commands, .. } => commands.first(),
        }
    }

    pub fn query(&self) -> &str {
        match self {
            Resolution::Empty => "",
            Resolution::Keyword { query, .. }
            | Resolution::Always { query, .. }
            | Resolution::Search { query, .. } => query,
        }
    }
}

/// A visible candidate and the command that produced it.
#[derive(Debug, Clone)]
pub struct MatchedItem {
    pub item: ResultItem,
    pub source: Arc<RegisteredCommand>,
}

impl Rankable for MatchedItem {
    fn rank_text(&self, key: RankKey) -> &str {
        self.item.rank_text(key)
    }

    fn rank_weight(&self) -> i32 {
        self.item.weight
    }
}

/// Result of a matcher pass.
#[derive(Debug, Clone, Default)]
pub struct MatchResult {
    pub command: Option<Arc<RegisteredCommand>>,
    pub query: String,
    pub items: Vec<MatchedItem>,
}

/// Resolves input against the registry and runs the active plugin(s).
#[derive(Clone)]
pub struct CommandMatcher {
    registry: Arc<PluginRegistry>,
    ranker: RankedMatcher,
}

impl CommandMatcher {
    pub fn new(registry: Arc<PluginRegistry>, ranker: RankedMatcher) -> Self {
        Self { registry, ranker }
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    /// Decide the active command for `raw` without calling any input handler.
    pub async fn resolve(&self, raw: &str) -> Resolution {
        if raw.trim().is_empty() {
            return Resolution::Empty;
        }

        let (token, rest) = split_token(raw);
        if let Some(command) = self.registry.resolve(token) {
            return Resolution::Keyword {
                command,
                query: rest.to_string(),
            };
        }

        for command in self.registry.always() {
            if command.plugin().accepts(command.command(), raw).await {
                return Resolution::Always {
                    command,
                    query: raw.to_string(),
                };
            }
        }

        Resolution::Search {
            commands: self.registry.fallback(),
            query: raw.to_string(),
        }
    }

    /// Resolve `raw` and collect candidates from the active plugin(s).
    pub async fn run(&self, raw: &str) -> MatchResult {
        match self.resolve(raw).await {
            Resolution::Empty => MatchResult::default(),
            Resolution::Keyword { command, query } | Resolution::Always { command, query } => {
                self.run_command(&command, &query).await
            }
            Resolution::Search { commands, query } => {
                let gathered = join_all(commands.iter().map(|c| gather(c, &query))).await;
                let merged: Vec<MatchedItem> = gathered.into_iter().flatten().collect();
                tracing::debug!(
                    "Search fallback: {} plugins contributed {} items",
                    commands.len(),
                    merged.len()
                );

                MatchResult {
                    items: self.ranker.order(merged, &query, None),
                    command: commands.into_iter().next(),
                    query,
                }
            }
        }
    }

    /// Collect candidates for a known command.
    ///
    /// A keyword command with nothing to offer shows its default item.
    pub async fn run_command(&self, command: &Arc<RegisteredCommand>, query: &str) -> MatchResult {
        let mut items = gather(command, query).await;

        if items.is_empty() && command.command().command_type == steward_core::CommandType::Keyword {
            items.push(MatchedItem {
                item: ResultItem::default_for(command.command()),
                source: Arc::clone(command),
            });
        }

        MatchResult {
            command: Some(Arc::clone(command)),
            query: query.to_string(),
            items,
        }
    }
}

/// Split on the first whitespace character into `(token, rest)`.
fn split_token(raw: &str) -> (&str, &str) {
    match raw.char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((i, c)) => (&raw[..i], &raw[i + c.len_utf8()..]),
        None => (raw, ""),
    }
}

/// Call one plugin's input handler, isolating failures.
async fn gather(source: &Arc<RegisteredCommand>, query: &str) -> Vec<MatchedItem> {
    match source.plugin().on_input(query, source.command()).await {
        Ok(Some(items)) => items
            .into_iter()
            .map(|item| MatchedItem {
                item,
                source: Arc::clone(source),
            })
            .collect(),
        Ok(None) => Vec::new(),
        Err(e) => {
            let err = EngineError::PluginInput {
                plugin: source.plugin_name().to_string(),
                message: e.to_string(),
            };
            tracing::warn!("{}", err);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::mock::StaticPlugin;
    use steward_core::{Command, CommandType};

    fn items(prefix: &str, n: usize) -> Vec<ResultItem> {
        (0..n)
            .map(|i| ResultItem::new("url", format!("{}{}", prefix, i)))
            .collect()
    }

    fn matcher(registry: PluginRegistry) -> CommandMatcher {
        CommandMatcher::new(Arc::new(registry), RankedMatcher::new())
    }

    fn is_digit_expr(input: &str) -> bool {
        input.chars().all(|c| c.is_ascii_digit() || "+-*/ ".contains(c))
    }

    #[test]
    fn test_split_token() {
        assert_eq!(split_token("calc 2+2"), ("calc", "2+2"));
        assert_eq!(split_token("calc"), ("calc", ""));
        assert_eq!(split_token("calc "), ("calc", ""));
        assert_eq!(split_token("tab  two"), ("tab", " two"));
    }

    #[tokio::test]
    async fn test_keyword_resolves_with_rest_as_query() {
        let mut registry = PluginRegistry::new();
        for key in ["tab", "bm", "calc"] {
            registry
                .register(
                    StaticPlugin::new(key, vec![Command::new(key, CommandType::Keyword)]).into_arc(),
                )
                .unwrap();
        }
        let matcher = matcher(registry);

        for key in ["tab", "bm", "calc"] {
            let resolution = matcher.resolve(&format!("{} anything", key)).await;
            assert!(matches!(resolution, Resolution::Keyword { .. }));
            assert_eq!(resolution.command().unwrap().command().key, key);
            assert_eq!(resolution.query(), "anything");
        }
    }

    #[tokio::test]
    async fn test_keyword_beats_always() {
        let mut registry = PluginRegistry::new();
        registry
            .register(
                StaticPlugin::new("Calculator", vec![Command::new("calc", CommandType::Always)])
                    .into_arc(),
            )
            .unwrap();
        registry
            .register(
                StaticPlugin::new("Tabs", vec![Command::new("tab", CommandType::Keyword)]).into_arc(),
            )
            .unwrap();
        let matcher = matcher(registry);

        let resolution = matcher.resolve("tab 1+1").await;
        assert_eq!(resolution.command().unwrap().plugin_name(), "Tabs");
    }

    #[tokio::test]
    async fn test_first_accepting_always_wins() {
        let mut registry = PluginRegistry::new();
        registry
            .register(
                StaticPlugin::new("Calculator", vec![Command::new("calc", CommandType::Always)])
                    .with_accepts(is_digit_expr)
                    .into_arc(),
            )
            .unwrap();
        registry
            .register(
                StaticPlugin::new("Chrome", vec![Command::new("chrome", CommandType::Search)])
                    .into_arc(),
            )
            .unwrap();
        let matcher = matcher(registry);

        let resolution = matcher.resolve("2+2").await;
        assert!(matches!(resolution, Resolution::Always { .. }));
        assert_eq!(resolution.query(), "2+2");

        let resolution = matcher.resolve("chr").await;
        assert!(matches!(resolution, Resolution::Search { .. }));
        assert_eq!(resolution.command().unwrap().plugin_name(), "Chrome");
    }

    #[tokio::test]
    async fn test_empty_input() {
        let matcher = matcher(PluginRegistry::new());
        assert!(matches!(matcher.resolve("").await, Resolution::Empty));
        assert!(matches!(matcher.resolve("   ").await, Resolution::Empty));
        assert!(matcher.run("").await.items.is_empty());
    }

    #[tokio::test]
    async fn test_search_fallback_merges_and_caps() {
        let mut registry = PluginRegistry::new();
        registry
            .register(
                StaticPlugin::new("Chrome", vec![Command::new("chrome", CommandType::Search)])
                    .with_items(items("chrome page ", 15))
                    .into_arc(),
            )
            .unwrap();
        registry
            .register(
                StaticPlugin::new("History", vec![Command::new("his", CommandType::Search)])
                    .with_items(items("chrome history ", 15))
                    .into_arc(),
            )
            .unwrap();
        let matcher = matcher(registry);

        let result = matcher.run("chr").await;
        assert_eq!(result.items.len(), 20);
        assert_eq!(result.command.unwrap().plugin_name(), "Chrome");
        assert_eq!(result.query, "chr");
    }

    #[tokio::test]
    async fn test_search_fallback_under_cap() {
        let mut registry = PluginRegistry::new();
        registry
            .register(
                StaticPlugin::new("Chrome", vec![Command::new("chrome", CommandType::Search)])
                    .with_items(items("chrome ", 5))
                    .into_arc(),
            )
            .unwrap();
        registry
            .register(
                StaticPlugin::new("Bookmarks", vec![Command::new("bm", CommandType::Search)])
                    .with_items(items("chrome bookmark ", 5))
                    .into_arc(),
            )
            .unwrap();
        let matcher = matcher(registry);

        let result = matcher.run("chr").await;
        assert_eq!(result.items.len(), 10);
        assert!(result.items.len() <= 20);
    }

    #[tokio::test]
    async fn test_failing_plugin_is_isolated() {
        let mut registry = PluginRegistry::new();
        registry
            .register(
                StaticPlugin::new("Broken", vec![Command::new("broken", CommandType::Search)])
                    .failing_input()
                    .into_arc(),
            )
            .unwrap();
        registry
            .register(
                StaticPlugin::new("Chrome", vec![Command::new("chrome", CommandType::Search)])
                    .with_items(items("chrome ", 3))
                    .into_arc(),
            )
            .unwrap();
        let matcher = matcher(registry);

        let result = matcher.run("chrome").await;
        assert_eq!(result.items.len(), 3);
        assert!(result.items.iter().all(|m| m.source.plugin_name() == "Chrome"));
    }

    #[tokio::test]
    async fn test_plugin_with_nothing_to_contribute() {
        let mut registry = PluginRegistry::new();
        registry
            .register(
                StaticPlugin::new("History", vec![Command::new("his", CommandType::Search)])
                    .returning_none()
                    .into_arc(),
            )
            .unwrap();
        registry
            .register(
                StaticPlugin::new("Chrome", vec![Command::new("chrome", CommandType::Search)])
                    .with_items(items("chrome ", 4))
                    .into_arc(),
            )
            .unwrap();
        registry
            .register(
                StaticPlugin::new("Tabs", vec![Command::new("tab", CommandType::Keyword)])
                    .returning_none()
                    .into_arc(),
            )
            .unwrap();
        let matcher = matcher(registry);

        let result = matcher.run("chrome").await;
        assert_eq!(result.items.len(), 4);
        assert!(result.items.iter().all(|m| m.source.plugin_name() == "Chrome"));
        assert_eq!(result.command.unwrap().plugin_name(), "History");

        let result = matcher.run("tab x").await;
        assert_eq!(result.items.len(), 1);
        assert!(result.items[0].item.is_default);
    }

    #[tokio::test]
    async fn test_keyword_without_items_shows_default() {
        let mut registry = PluginRegistry::new();
        registry
            .register(
                StaticPlugin::new(
                    "Components",
                    vec![Command::new("show", CommandType::Keyword).with_title("Show component")],
                )
                .into_arc(),
            )
            .unwrap();
        let matcher = matcher(registry);

        let result = matcher.run("show ").await;
        assert_eq!(result.items.len(), 1);
        assert!(result.items[0].item.is_default);
        assert_eq!(result.items[0].item.title, "Show component");
    }
}
