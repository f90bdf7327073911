//! Plugin API and command engine for the Steward launcher.
//!
//! This crate provides:
//! - The `Plugin` and `Host` contracts
//! - Plugin registration with validation and config overrides
//! - Command matching (keyword, always, search fallback)
//! - Fuzzy ranking with phonetic transliteration
//! - The engine state machine with debouncing, workflows and batch execution

pub mod batch;
pub mod context;
pub mod engine;
pub mod error;
pub mod host;
pub mod matcher;
pub mod plugin;
pub mod ranking;
pub mod registry;
pub mod workflow;

// Re-export commonly used types
pub use batch::{BatchExecutor, BatchReport, Selection, OPERAND_MARK};
pub use context::EngineContext;
pub use engine::{Debouncer, Engine, Snapshot, Stage};
pub use error::{HostError, PluginError, PluginResult};
pub use host::{
    ensure_storage_safe, fill_template, localized_commands, open_in_background, open_item,
    CommandSpec, Host, NullHost, OpenTarget,
};
pub use matcher::{CommandMatcher, MatchResult, MatchedItem, Resolution};
pub use plugin::{EnterOutcome, Plugin, PluginFactory, PluginMeta};
pub use ranking::{RankKey, Rankable, RankedMatcher, RESULT_LIMIT};
pub use registry::{PluginRegistry, RegisteredCommand};
pub use workflow::WorkflowStack;

// Re-export steward_core types for convenience
pub use steward_core::{
    AppConfig, Command, CommandRef, CommandType, EngineError, KeyStatus, RegistryError, ResultItem,
};
