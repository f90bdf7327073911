//! Lua scripting for the Steward launcher.
//!
//! Scripts declare plugins with `steward.plugin{...}`. The Lua state lives on
//! a dedicated thread ([`LuaRuntime`]); [`LuaPlugin`] adapts each declaration
//! to the `Plugin` trait so the engine cannot tell it from a native plugin.

pub mod api;
pub mod effect;
pub mod error;
pub mod plugin;
pub mod runtime;

use std::sync::Arc;

use mlua::Lua;
use steward_plugin_api::{Host, Plugin};

pub use api::{parse_plugin, register_steward_api, take_declared, LuaFunctionRef, LuaPluginSpec};
pub use effect::{Effect, EffectCollector};
pub use error::RuntimeError;
pub use plugin::LuaPlugin;
pub use runtime::LuaRuntime;

/// A runtime with the `steward` global installed.
pub fn steward_runtime() -> Result<LuaRuntime, RuntimeError> {
    let lua = Lua::new();
    register_steward_api(&lua)?;
    Ok(LuaRuntime::new(lua))
}

/// Run a script and return the plugins it declared.
pub async fn load_plugins(
    runtime: &LuaRuntime,
    chunk_name: &str,
    source: &str,
) -> Result<Vec<LuaPluginSpec>, RuntimeError> {
    let chunk_name = chunk_name.to_string();
    let source = source.to_string();

    let specs = runtime
        .with_lua(move |lua| {
            lua.load(source.as_str()).set_name(chunk_name).exec()?;
            Ok(take_declared(lua))
        })
        .await?;

    tracing::info!("Loaded {} Lua plugins", specs.len());
    Ok(specs)
}

/// Wrap declarations as engine plugins sharing one runtime.
pub fn into_plugins(
    specs: Vec<LuaPluginSpec>,
    runtime: Arc<LuaRuntime>,
    host: Arc<dyn Host>,
) -> Vec<Arc<dyn Plugin>> {
    specs
        .into_iter()
        .map(|spec| {
            Arc::new(LuaPlugin::new(spec, Arc::clone(&runtime), Arc::clone(&host))) as Arc<dyn Plugin>
        })
        .collect()
}
