//! The `steward` global for Lua scripts.
//!
//! - `steward.plugin{...}` declares a plugin
//! - `steward.copy(text)`, `steward.open(url, opts?)`, `steward.message(action)`
//!   queue host effects from inside a callback
//! - `steward.log(msg)` writes to the application log

use std::sync::atomic::{AtomicU64, Ordering};

use mlua::{Function, Lua, LuaSerdeExt, Result as LuaResult, Table, Value};
use serde::{Deserialize, Serialize};
use steward_core::Command;
use steward_plugin_api::PluginMeta;

use crate::effect::{collect, Effect};

// =============================================================================
// Function references
// =============================================================================

/// Suffix that keeps registry keys unique across plugins and reloads.
static FUNCTION_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A Lua function kept alive in the named registry.
///
/// Only the key crosses threads; the function itself stays in the Lua state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LuaFunctionRef {
    pub key: String,
}

impl LuaFunctionRef {
    /// Park `func` in the named registry under `{prefix}:{n}`.
    pub fn from_function(lua: &Lua, func: Function, prefix: &str) -> LuaResult<Self> {
        let id = FUNCTION_COUNTER.fetch_add(1, Ordering::SeqCst);
        let key = format!("{}:{}", prefix, id);
        lua.set_named_registry_value(&key, func)?;
        Ok(Self { key })
    }

    /// Call the parked function. Must run on the Lua thread.
    pub fn call<A, R>(&self, lua: &Lua, args: A) -> LuaResult<R>
    where
        A: mlua::IntoLuaMulti,
        R: mlua::FromLuaMulti,
    {
        let func: Function = lua.named_registry_value(&self.key)?;
        func.call(args)
    }

    /// Release the parked function.
    pub fn remove(&self, lua: &Lua) -> LuaResult<()> {
        lua.unset_named_registry_value(&self.key)
    }
}

// =============================================================================
// Plugin declarations
// =============================================================================

/// A plugin declared by `steward.plugin{...}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LuaPluginSpec {
    pub meta: PluginMeta,
    pub commands: Vec<Command>,
    pub accepts: Option<LuaFunctionRef>,
    pub on_input: LuaFunctionRef,
    pub on_enter: Option<LuaFunctionRef>,
}

/// Declarations made since the last [`take_declared`].
#[derive(Debug, Default)]
struct Declared(Vec<LuaPluginSpec>);

/// Register the `steward` global in a Lua state.
pub fn register_steward_api(lua: &Lua) -> LuaResult<()> {
    let steward = lua.create_table()?;
    lua.set_app_data(Declared::default());

    // steward.plugin{ name, commands, on_input, ... }
    let plugin_fn = lua.create_function(|lua, table: Table| {
        let spec = parse_plugin(lua, table)?;
        tracing::debug!(
            "Lua plugin '{}' declared with {} commands",
            spec.meta.name,
            spec.commands.len()
        );

        let mut declared = lua
            .app_data_mut::<Declared>()
            .ok_or_else(|| mlua::Error::RuntimeError("steward API is not initialized".into()))?;
        declared.0.push(spec);
        Ok(())
    })?;
    steward.set("plugin", plugin_fn)?;

    let copy_fn = lua.create_function(|lua, text: String| collect(lua, Effect::Copy(text)))?;
    steward.set("copy", copy_fn)?;

    // steward.open(url, { background = true })
    let open_fn = lua.create_function(|lua, (url, opts): (String, Option<Table>)| {
        let background = match opts {
            Some(opts) => opts.get::<Option<bool>>("background")?.unwrap_or(false),
            None => false,
        };
        let effect = if background {
            Effect::OpenInBackground(url)
        } else {
            Effect::Open(url)
        };
        collect(lua, effect)
    })?;
    steward.set("open", open_fn)?;

    let message_fn =
        lua.create_function(|lua, action: String| collect(lua, Effect::Message(action)))?;
    steward.set("message", message_fn)?;

    let log_fn = lua.create_function(|_, message: String| {
        tracing::info!(target: "lua", "{}", message);
        Ok(())
    })?;
    steward.set("log", log_fn)?;

    lua.globals().set("steward", steward)?;
    Ok(())
}

/// Drain the plugins declared so far.
pub fn take_declared(lua: &Lua) -> Vec<LuaPluginSpec> {
    lua.app_data_mut::<Declared>()
        .map(|mut declared| std::mem::take(&mut declared.0))
        .unwrap_or_default()
}

/// Parse a plugin declaration.
///
/// Expected table shape:
/// ```lua
/// {
///   name = "string",              -- required, unique
///   version = 1,                  -- optional
///   category = "string",          -- optional
///   icon = "string",              -- optional
///   title = "string",             -- optional
///   can_disabled = true,          -- optional
///   commands = { { key = "calc", type = "keyword", ... } },  -- required
///   accepts = function(input, command),                      -- optional
///   on_input = function(query, command),                     -- required
///   on_enter = function(item, command, query, key_status),   -- optional
/// }
/// ```
pub fn parse_plugin(lua: &Lua, table: Table) -> LuaResult<LuaPluginSpec> {
    let name: String = table
        .get("name")
        .map_err(|_| mlua::Error::RuntimeError("Plugin missing required 'name' field".into()))?;

    let version: Option<u32> = table.get("version")?;
    let mut meta = PluginMeta::new(name.clone(), version.unwrap_or(1));
    if let Some(category) = table.get::<Option<String>>("category")? {
        meta = meta.with_category(category);
    }
    if let Some(icon) = table.get::<Option<String>>("icon")? {
        meta = meta.with_icon(icon);
    }
    if let Some(title) = table.get::<Option<String>>("title")? {
        meta = meta.with_title(title);
    }
    if let Some(can_disabled) = table.get::<Option<bool>>("can_disabled")? {
        meta = meta.with_can_disabled(can_disabled);
    }

    let command_tables: Table = table.get("commands").map_err(|_| {
        mlua::Error::RuntimeError(format!("Plugin '{}' missing required 'commands' table", name))
    })?;
    let mut commands = Vec::new();
    for entry in command_tables.sequence_values::<Table>() {
        let mut command: Command = lua.from_value(Value::Table(entry?)).map_err(|e| {
            mlua::Error::RuntimeError(format!("Plugin '{}' has an invalid command: {}", name, e))
        })?;
        if command.orkey.is_none() {
            command.orkey = Some(command.key.clone());
        }
        commands.push(command);
    }

    let on_input = table.get::<Function>("on_input").map_err(|_| {
        mlua::Error::RuntimeError(format!("Plugin '{}' missing required 'on_input' function", name))
    })?;
    let on_input = LuaFunctionRef::from_function(lua, on_input, &format!("plugin:{}:on_input", name))?;

    let accepts = match table.get::<Option<Function>>("accepts")? {
        Some(func) => Some(LuaFunctionRef::from_function(
            lua,
            func,
            &format!("plugin:{}:accepts", name),
        )?),
        None => None,
    };

    let on_enter = match table.get::<Option<Function>>("on_enter")? {
        Some(func) => Some(LuaFunctionRef::from_function(
            lua,
            func,
            &format!("plugin:{}:on_enter", name),
        )?),
        None => None,
    };

    Ok(LuaPluginSpec {
        meta,
        commands,
        accepts,
        on_input,
        on_enter,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use steward_core::CommandType;

    fn lua_with_api() -> Lua {
        let lua = Lua::new();
        register_steward_api(&lua).unwrap();
        lua
    }

    #[test]
    fn test_parse_plugin() {
        let lua = lua_with_api();
        lua.load(
            r#"
            steward.plugin {
                name = "Tabs",
                version = 2,
                category = "browser",
                can_disabled = true,
                commands = {
                    { key = "tab", type = "keyword", title = "Search tabs", allow_batch = true },
                    { key = "tabs", type = "search" },
                },
                on_input = function(query, command) return nil end,
                on_enter = function(item) return false end,
            }
            "#,
        )
        .exec()
        .unwrap();

        let declared = take_declared(&lua);
        assert_eq!(declared.len(), 1);

        let spec = &declared[0];
        assert_eq!(spec.meta.name, "Tabs");
        assert_eq!(spec.meta.version, 2);
        assert_eq!(spec.meta.category, "browser");
        assert!(spec.meta.can_disabled);
        assert_eq!(spec.commands.len(), 2);
        assert_eq!(spec.commands[0].command_type, CommandType::Keyword);
        assert_eq!(spec.commands[0].orkey.as_deref(), Some("tab"));
        assert!(spec.commands[0].allow_batch);
        assert!(spec.commands[0].editable);
        assert_eq!(spec.commands[1].command_type, CommandType::Search);
        assert!(spec.accepts.is_none());
        assert!(spec.on_enter.is_some());

        // Drained.
        assert!(take_declared(&lua).is_empty());
    }

    #[test]
    fn test_missing_on_input_rejected() {
        let lua = lua_with_api();
        let result = lua
            .load(r#"steward.plugin { name = "Broken", commands = {} }"#)
            .exec();

        let err = result.unwrap_err().to_string();
        assert!(err.contains("on_input"), "unexpected error: {}", err);
        assert!(take_declared(&lua).is_empty());
    }

    #[test]
    fn test_invalid_command_type_rejected() {
        let lua = lua_with_api();
        let result = lua
            .load(
                r#"steward.plugin {
                    name = "Odd",
                    commands = { { key = "x", type = "sometimes" } },
                    on_input = function() end,
                }"#,
            )
            .exec();

        assert!(result.is_err());
    }

    #[test]
    fn test_effects_outside_callback_fail() {
        let lua = lua_with_api();
        assert!(lua.load(r#"steward.copy("text")"#).exec().is_err());
    }

    #[test]
    fn test_function_ref_round_trip() {
        let lua = Lua::new();
        let func = lua.load("return function(a, b) return a + b end").eval::<Function>().unwrap();
        let func_ref = LuaFunctionRef::from_function(&lua, func, "test:add").unwrap();

        assert!(func_ref.key.starts_with("test:add:"));
        let sum: i64 = func_ref.call(&lua, (2, 3)).unwrap();
        assert_eq!(sum, 5);

        func_ref.remove(&lua).unwrap();
        assert!(func_ref.call::<_, i64>(&lua, (2, 3)).is_err());
    }
}
