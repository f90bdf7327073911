//! Core types for the Steward launcher.
//!
//! This crate contains shared data structures that are used across all Steward crates:
//! - Command and command type definitions
//! - Result items and modifier key state
//! - Configuration types
//! - Error types

mod command;
mod config;
mod error;
mod item;

pub use command::{Command, CommandRef, CommandType};
pub use config::{config_dir, config_path, init_lua_path, AppConfig, GeneralConfig};
pub use error::{ConfigError, EngineError, RegistryError};
pub use item::{KeyStatus, ResultItem};
