//! Plugin Registry
//!
//! Holds the ordered collection of loaded plugins and the flattened list of
//! commands they declare. Built mutably at startup, then shared read-only
//! behind an `Arc`; nothing registers after the engine accepts input.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use steward_core::{AppConfig, Command, CommandRef, CommandType, RegistryError};

use crate::context::EngineContext;
use crate::plugin::{Plugin, PluginFactory};

/// A command together with the plugin that owns it.
pub struct RegisteredCommand {
    plugin: Arc<dyn Plugin>,
    command: Command,
    reference: CommandRef,
}

impl RegisteredCommand {
    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    pub fn plugin_name(&self) -> &str {
        &self.plugin.meta().name
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    /// The serialized reference used by the workflow stack.
    pub fn reference(&self) -> &CommandRef {
        &self.reference
    }

    pub fn command_type(&self) -> CommandType {
        self.command.command_type
    }
}

impl std::fmt::Debug for RegisteredCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredCommand")
            .field("reference", &self.reference)
            .field("key", &self.command.key)
            .field("type", &self.command.command_type)
            .finish()
    }
}

/// The plugin registry.
pub struct PluginRegistry {
    plugins: Vec<Arc<dyn Plugin>>,

    /// All commands in declaration order.
    commands: Vec<Arc<RegisteredCommand>>,

    /// Plugin names to skip (only honored for plugins that can be disabled).
    disabled: HashSet<String>,

    /// Custom keys for editable commands, keyed by `plugin:original_key`.
    key_overrides: HashMap<String, String>,
}

impl PluginRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            plugins: Vec::new(),
            commands: Vec::new(),
            disabled: HashSet::new(),
            key_overrides: HashMap::new(),
        }
    }

    /// Create a registry that applies the config's disabled plugins and key overrides.
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            disabled: config.disabled_plugins.iter().cloned().collect(),
            key_overrides: config.command_keys.clone(),
            ..Self::new()
        }
    }

    /// Register a plugin and its commands.
    ///
    /// Fails if the plugin is malformed or if any `(plugin, key)` pair
    /// collides with an already registered command.
    pub fn register(&mut self, plugin: Arc<dyn Plugin>) -> Result<(), RegistryError> {
        let name = plugin.meta().name.clone();

        if name.trim().is_empty() {
            return Err(RegistryError::InvalidPlugin {
                plugin: name,
                reason: "plugin name is empty".to_string(),
            });
        }

        if self.disabled.contains(&name) {
            if plugin.meta().can_disabled {
                tracing::info!("Skipping disabled plugin: {}", name);
                return Ok(());
            }
            tracing::warn!("Plugin '{}' cannot be disabled, registering anyway", name);
        }

        if plugin.commands().is_empty() {
            tracing::warn!("Plugin '{}' declares no commands", name);
        }

        let mut pending: Vec<Command> = Vec::with_capacity(plugin.commands().len());
        for declared in plugin.commands() {
            let command = self.apply_override(&name, declared.clone());
            validate_command(&name, &command)?;

            let taken = self
                .commands
                .iter()
                .filter(|c| c.plugin_name() == name)
                .map(|c| &c.command)
                .chain(pending.iter())
                .any(|c| c.is_named(&command.key) || c.is_named(command.original_key()));
            if taken {
                return Err(RegistryError::DuplicateCommand {
                    plugin: name,
                    key: command.key,
                });
            }

            pending.push(command);
        }

        for command in pending {
            tracing::debug!("Registered command {}:{}", name, command.key);
            self.commands.push(Arc::new(RegisteredCommand {
                reference: CommandRef::new(&name, &command),
                plugin: Arc::clone(&plugin),
                command,
            }));
        }

        tracing::info!("Registered plugin: {}", name);
        self.plugins.push(plugin);
        Ok(())
    }

    /// Build plugins from factories and register them in order.
    pub fn register_factories(
        &mut self,
        ctx: &EngineContext,
        factories: &[PluginFactory],
    ) -> Result<(), RegistryError> {
        for factory in factories {
            self.register(factory(ctx))?;
        }
        Ok(())
    }

    /// First keyword command named by `token`, by key or original key.
    pub fn resolve(&self, token: &str) -> Option<Arc<RegisteredCommand>> {
        self.commands
            .iter()
            .find(|c| c.command_type() == CommandType::Keyword && c.command.is_named(token))
            .cloned()
    }

    /// `always` commands in declaration order.
    pub fn always(&self) -> Vec<Arc<RegisteredCommand>> {
        self.of_type(CommandType::Always)
    }

    /// `search` commands in declaration order.
    pub fn fallback(&self) -> Vec<Arc<RegisteredCommand>> {
        self.of_type(CommandType::Search)
    }

    /// Find the command a workflow reference points at.
    pub fn lookup(&self, reference: &CommandRef) -> Option<Arc<RegisteredCommand>> {
        self.commands
            .iter()
            .find(|c| &c.reference == reference)
            .cloned()
    }

    /// Registered plugins in registration order.
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    pub fn commands(&self) -> &[Arc<RegisteredCommand>] {
        &self.commands
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    pub fn command_count(&self) -> usize {
        self.commands.len()
    }

    fn of_type(&self, command_type: CommandType) -> Vec<Arc<RegisteredCommand>> {
        self.commands
            .iter()
            .filter(|c| c.command_type() == command_type)
            .cloned()
            .collect()
    }

    fn apply_override(&self, plugin: &str, mut command: Command) -> Command {
        if !command.editable {
            return command;
        }

        let id = format!("{}:{}", plugin, command.original_key());
        if let Some(key) = self.key_overrides.get(&id) {
            tracing::debug!("Command {} remapped to '{}'", id, key);
            if command.orkey.is_none() {
                command.orkey = Some(command.key.clone());
            }
            command.key = key.clone();
        }
        command
    }
}

impl Default for PluginRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn validate_command(plugin: &str, command: &Command) -> Result<(), RegistryError> {
    if command.key.is_empty() {
        return Err(RegistryError::InvalidPlugin {
            plugin: plugin.to_string(),
            reason: "command key is empty".to_string(),
        });
    }

    if command.command_type == CommandType::Keyword && command.key.contains(char::is_whitespace) {
        return Err(RegistryError::InvalidPlugin {
            plugin: plugin.to_string(),
            reason: format!("keyword '{}' contains whitespace", command.key),
        });
    }

    Ok(())
}
