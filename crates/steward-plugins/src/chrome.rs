//! Browser internal pages.
//!
//! A search command: contributes `chrome://` pages to the fallback results.

use std::sync::Arc;

use async_trait::async_trait;
use steward_core::{Command, CommandType, KeyStatus, ResultItem};
use steward_plugin_api::{
    open_in_background, open_item, EngineContext, EnterOutcome, Host, Plugin, PluginMeta,
    PluginResult, RankedMatcher,
};

const NAME: &str = "chrome";
const ICON: &str = "iconfont/chrome.svg";

/// Internal pages are shown after other sources at equal score.
const WEIGHT: i32 = 3;

pub const CHROME_URLS: &[&str] = &[
    "chrome://settings/people",
    "chrome://settings/appearance",
    "chrome://settings/search",
    "chrome://settings/defaultBrowser",
    "chrome://settings/onStartup",
    "chrome://settings/privacy",
    "chrome://settings/passwords",
    "chrome://settings/languages",
    "chrome://settings/downloads",
    "chrome://settings/printing",
    "chrome://settings/accessibility",
    "chrome://settings/system",
    "chrome://settings/reset",
    "chrome://settings/help",
    "chrome://extensions/shortcuts",
    "chrome://about",
    "chrome://accessibility",
    "chrome://appcache-internals",
    "chrome://apps",
    "chrome://blob-internals",
    "chrome://bluetooth-internals",
    "chrome://bookmarks",
    "chrome://chrome-urls",
    "chrome://components",
    "chrome://crashes",
    "chrome://credits",
    "chrome://device-log",
    "chrome://devices",
    "chrome://dino",
    "chrome://downloads",
    "chrome://extensions",
    "chrome://flags",
    "chrome://gcm-internals",
    "chrome://gpu",
    "chrome://help",
    "chrome://histograms",
    "chrome://history",
    "chrome://indexeddb-internals",
    "chrome://inspect",
    "chrome://invalidations",
    "chrome://local-state",
    "chrome://media-engagement",
    "chrome://media-internals",
    "chrome://nacl",
    "chrome://net-export",
    "chrome://net-internals",
    "chrome://network-error",
    "chrome://network-errors",
    "chrome://newtab",
    "chrome://ntp-tiles-internals",
    "chrome://omnibox",
    "chrome://password-manager-internals",
    "chrome://policy",
    "chrome://predictors",
    "chrome://print",
    "chrome://profiler",
    "chrome://quota-internals",
    "chrome://safe-browsing",
    "chrome://serviceworker-internals",
    "chrome://settings",
    "chrome://signin-internals",
    "chrome://site-engagement",
    "chrome://suggestions",
    "chrome://supervised-user-internals",
    "chrome://sync-internals",
    "chrome://system",
    "chrome://taskscheduler-internals",
    "chrome://terms",
    "chrome://thumbnails",
    "chrome://tracing",
    "chrome://translate-internals",
    "chrome://usb-internals",
    "chrome://user-actions",
    "chrome://version",
    "chrome://view-http-cache",
    "chrome://webrtc-internals",
    "chrome://webrtc-logs",
];

/// Debug URLs, offered with the `copy` key: entering one copies the URL
/// rather than opening it.
pub const CHROME_DEBUG: &[&str] = &[
    "chrome://badcastcrash/",
    "chrome://inducebrowsercrashforrealz/",
    "chrome://crash/",
    "chrome://crashdump/",
    "chrome://kill/",
    "chrome://hang/",
    "chrome://shorthang/",
    "chrome://gpuclean/",
    "chrome://gpucrash/",
    "chrome://gpuhang/",
    "chrome://memory-exhaust/",
    "chrome://memory-pressure-critical/",
    "chrome://memory-pressure-moderate/",
    "chrome://ppapiflashcrash/",
    "chrome://ppapiflashhang/",
    "chrome://quit/",
    "chrome://restart/",
];

pub struct ChromePages {
    meta: PluginMeta,
    commands: Vec<Command>,
    ranker: RankedMatcher,
    host: Arc<dyn Host>,
}

impl ChromePages {
    pub fn new(host: Arc<dyn Host>, ranker: RankedMatcher) -> Self {
        let title = host.localized(&format!("{}_title", NAME), &[]);

        Self {
            meta: PluginMeta::new("Chrome", 1)
                .with_category("browser")
                .with_icon(ICON)
                .with_title(title.clone()),
            commands: vec![Command::new(NAME, CommandType::Search)
                .with_title(title)
                .with_icon(ICON)
                .with_batch(true)],
            ranker,
            host,
        }
    }

    fn items(&self, urls: &[&'static str], key: &str, query: &str) -> Vec<ResultItem> {
        self.ranker
            .rank(urls.to_vec(), query, None)
            .into_iter()
            .map(|url| {
                ResultItem::new(key, page_title(url))
                    .with_icon(ICON)
                    .with_desc(url)
                    .with_weight(WEIGHT)
                    .with_content(serde_json::Value::String(url.to_string()))
            })
            .collect()
    }
}

pub fn factory(ctx: &EngineContext) -> Arc<dyn Plugin> {
    Arc::new(ChromePages::new(Arc::clone(ctx.host()), ctx.ranker().clone()))
}

/// `chrome://settings/people` reads as `settings people`.
fn page_title(url: &str) -> String {
    let path = url.split_once("//").map_or(url, |(_, rest)| rest);
    path.replacen('/', " ", 1).trim().to_string()
}

#[async_trait]
impl Plugin for ChromePages {
    fn meta(&self) -> &PluginMeta {
        &self.meta
    }

    fn commands(&self) -> &[Command] {
        &self.commands
    }

    async fn on_input(
        &self,
        query: &str,
        _command: &Command,
    ) -> PluginResult<Option<Vec<ResultItem>>> {
        let mut items = self.items(CHROME_URLS, "url", query);
        items.extend(self.items(CHROME_DEBUG, "copy", query));
        Ok(Some(items))
    }

    async fn on_enter(
        &self,
        item: &ResultItem,
        _command: &Command,
        _query: &str,
        key_status: &KeyStatus,
    ) -> PluginResult<EnterOutcome> {
        let url = item.content_text();
        if item.key == "copy" {
            self.host.write_clipboard(url).await?;
        } else if key_status.shift_key {
            open_in_background(self.host.as_ref(), url).await?;
        } else {
            open_item(self.host.as_ref(), url, key_status).await?;
        }
        Ok(EnterOutcome::Done)
    }
}
