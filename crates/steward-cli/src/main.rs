//! Steward - headless launcher front end.
//!
//! Reads one line per "keystroke burst" from stdin and prints the engine's
//! snapshot after each. Lines starting with `:` drive selection:
//!
//! - `:enter N [shift|meta]` act on item N
//! - `:back` backspace on an empty input
//! - `:reset` return to idle
//! - `:json` toggle JSON snapshots
//! - `:quit`

mod host;

use std::sync::Arc;

use steward_core::{init_lua_path, AppConfig, KeyStatus};
use steward_lua_runtime::{into_plugins, load_plugins, steward_runtime};
use steward_plugin_api::{Engine, EngineContext, Host, PluginRegistry, Snapshot};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::host::ConsoleHost;

// =============================================================================
// Input lines
// =============================================================================

#[derive(Debug, PartialEq, Eq)]
enum Line {
    Text(String),
    Enter(usize, KeyStatus),
    Back,
    Reset,
    ToggleJson,
    Quit,
}

fn parse_line(line: &str) -> Result<Line, String> {
    let Some(directive) = line.strip_prefix(':') else {
        return Ok(Line::Text(line.to_string()));
    };

    let mut parts = directive.split_whitespace();
    match parts.next() {
        Some("enter") => {
            let index = match parts.next() {
                Some(n) => n.parse().map_err(|_| format!("not an index: {}", n))?,
                None => 0,
            };
            let key_status = match parts.next() {
                None => KeyStatus::default(),
                Some("shift") => KeyStatus::shift(),
                Some("meta") => KeyStatus::meta(),
                Some(other) => return Err(format!("unknown modifier: {}", other)),
            };
            Ok(Line::Enter(index, key_status))
        }
        Some("back") => Ok(Line::Back),
        Some("reset") => Ok(Line::Reset),
        Some("json") => Ok(Line::ToggleJson),
        Some("quit") | Some("q") => Ok(Line::Quit),
        _ => Err(format!("unknown directive: {}", line)),
    }
}

// =============================================================================
// Output
// =============================================================================

fn print_snapshot(snapshot: &Snapshot, json: bool) {
    if json {
        match serde_json::to_string(snapshot) {
            Ok(text) => println!("{}", text),
            Err(e) => tracing::error!("Failed to serialize snapshot: {}", e),
        }
        return;
    }

    let command = snapshot
        .command
        .as_ref()
        .map(|c| c.key.as_str())
        .unwrap_or("-");
    println!(
        "[{:?}] {} | query: {:?} | depth: {}",
        snapshot.stage, command, snapshot.query, snapshot.workflow_depth
    );
    for (i, item) in snapshot.items.iter().enumerate() {
        match item.desc.as_deref() {
            Some(desc) if !desc.is_empty() => println!("  {:>2}. {}  ({})", i, item.title, desc),
            _ => println!("  {:>2}. {}", i, item.title),
        }
    }
    if let Some(error) = &snapshot.error {
        println!("  ! {}", error);
    }
}

// =============================================================================
// Setup
// =============================================================================

/// Initialize the tracing subscriber. `RUST_LOG` overrides the default level.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

async fn build_engine() -> Result<Engine, String> {
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Using default config: {}", e);
            AppConfig::default()
        }
    };

    let host: Arc<dyn Host> = Arc::new(ConsoleHost::new());
    let mut registry = PluginRegistry::from_config(&config);
    let ctx = Arc::new(EngineContext::new(Arc::clone(&host), config));

    registry
        .register_factories(&ctx, &steward_plugins::builtin_factories())
        .map_err(|e| format!("Failed to register built-in plugins: {}", e))?;

    if let Some(path) = init_lua_path().filter(|p| p.exists()) {
        tracing::info!("Loading {}", path.display());
        let source = std::fs::read_to_string(&path)
            .map_err(|e| format!("Failed to read {}: {}", path.display(), e))?;

        let runtime = Arc::new(steward_runtime().map_err(|e| e.to_string())?);
        match load_plugins(&runtime, "init.lua", &source).await {
            Ok(specs) => {
                for plugin in into_plugins(specs, runtime, Arc::clone(&host)) {
                    registry
                        .register(plugin)
                        .map_err(|e| format!("Failed to register Lua plugin: {}", e))?;
                }
            }
            Err(e) => tracing::error!("Failed to load init.lua: {}", e),
        }
    } else {
        tracing::info!("No init.lua found, using built-in plugins only");
    }

    tracing::info!(
        "{} plugins, {} commands",
        registry.plugin_count(),
        registry.command_count()
    );
    Ok(Engine::new(ctx, Arc::new(registry)))
}

async fn run() -> Result<(), String> {
    let engine = build_engine().await?;
    let mut json = false;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.map_err(|e| e.to_string())? {
        let line = match parse_line(&line) {
            Ok(line) => line,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };

        match line {
            Line::Text(text) => {
                engine.input(&text);
                engine.search_now().await;
            }
            Line::Enter(index, key_status) => {
                if let Err(e) = engine.enter(index, key_status).await {
                    tracing::warn!("{}", e);
                }
            }
            Line::Back => {
                if !engine.backspace().await {
                    tracing::debug!("Nothing to go back to");
                }
            }
            Line::Reset => engine.reset(),
            Line::ToggleJson => json = !json,
            Line::Quit => break,
        }

        print_snapshot(&engine.snapshot(), json);
    }

    Ok(())
}

// =============================================================================
// Entry Point
// =============================================================================

fn main() {
    init_tracing();
    tracing::info!("Steward starting...");

    let rt = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run()) {
        tracing::error!("{}", e);
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("calc 1+1"), Ok(Line::Text("calc 1+1".to_string())));
        assert_eq!(parse_line(""), Ok(Line::Text(String::new())));
        assert_eq!(parse_line(":enter"), Ok(Line::Enter(0, KeyStatus::default())));
        assert_eq!(parse_line(":enter 2 shift"), Ok(Line::Enter(2, KeyStatus::shift())));
        assert_eq!(parse_line(":enter 1 meta"), Ok(Line::Enter(1, KeyStatus::meta())));
        assert_eq!(parse_line(":back"), Ok(Line::Back));
        assert_eq!(parse_line(":q"), Ok(Line::Quit));
        assert!(parse_line(":enter x").is_err());
        assert!(parse_line(":enter 1 hyper").is_err());
        assert!(parse_line(":dance").is_err());
    }
}
