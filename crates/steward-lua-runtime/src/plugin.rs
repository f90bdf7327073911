//! Adapter exposing a Lua-declared plugin through the `Plugin` trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use mlua::{Lua, LuaSerdeExt, SerializeOptions, Value};
use serde::Serialize;
use steward_core::{Command, KeyStatus, ResultItem};
use steward_plugin_api::{
    open_in_background, open_item, EnterOutcome, Host, Plugin, PluginMeta, PluginResult,
};

use crate::api::LuaPluginSpec;
use crate::effect::{with_effects, Effect};
use crate::runtime::LuaRuntime;

/// Upper bound for `on_input` and `on_enter`.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(5);

/// `accepts` runs on every keystroke that reaches the `always` pass.
pub const ACCEPTS_TIMEOUT: Duration = Duration::from_millis(250);

/// Convert a Rust value into a Lua table; `None` fields become `nil`.
fn to_lua<T: Serialize>(lua: &Lua, value: &T) -> mlua::Result<Value> {
    let options = SerializeOptions::new()
        .serialize_none_to_null(false)
        .serialize_unit_to_null(false);
    lua.to_value_with(value, options)
}

/// `false`/`nil` finish, `true` keeps the command, a string chains.
fn outcome_from_lua(value: Value) -> mlua::Result<EnterOutcome> {
    match value {
        Value::Nil | Value::Boolean(false) => Ok(EnterOutcome::Done),
        Value::Boolean(true) => Ok(EnterOutcome::Keep),
        Value::String(text) => Ok(EnterOutcome::Workflow(text.to_str()?.to_string())),
        other => Err(mlua::Error::RuntimeError(format!(
            "on_enter must return a boolean, nil or a string, got {}",
            other.type_name()
        ))),
    }
}

pub struct LuaPlugin {
    spec: LuaPluginSpec,
    runtime: Arc<LuaRuntime>,
    host: Arc<dyn Host>,
}

impl LuaPlugin {
    pub fn new(spec: LuaPluginSpec, runtime: Arc<LuaRuntime>, host: Arc<dyn Host>) -> Self {
        Self {
            spec,
            runtime,
            host,
        }
    }

    async fn apply_effects(&self, effects: Vec<Effect>, key_status: &KeyStatus) -> PluginResult<()> {
        for effect in effects {
            tracing::debug!("Applying {:?} from '{}'", effect, self.spec.meta.name);
            match effect {
                Effect::Copy(text) => self.host.write_clipboard(&text).await?,
                Effect::Open(url) => open_item(self.host.as_ref(), &url, key_status).await?,
                Effect::OpenInBackground(url) => open_in_background(self.host.as_ref(), &url).await?,
                Effect::Message(action) => {
                    self.host.send_runtime_message(&action).await?;
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Plugin for LuaPlugin {
    fn meta(&self) -> &PluginMeta {
        &self.spec.meta
    }

    fn commands(&self) -> &[Command] {
        &self.spec.commands
    }

    async fn accepts(&self, command: &Command, input: &str) -> bool {
        let Some(func) = self.spec.accepts.clone() else {
            return true;
        };
        let command = command.clone();
        let input = input.to_string();

        let result = self
            .runtime
            .with_lua_timeout(ACCEPTS_TIMEOUT, move |lua| {
                let command = to_lua(lua, &command)?;
                func.call::<_, bool>(lua, (input, command))
            })
            .await;

        result.unwrap_or_else(|e| {
            tracing::warn!("'{}' accepts failed: {}", self.spec.meta.name, e);
            false
        })
    }

    async fn on_input(
        &self,
        query: &str,
        command: &Command,
    ) -> PluginResult<Option<Vec<ResultItem>>> {
        let func = self.spec.on_input.clone();
        let command = command.clone();
        let query = query.to_string();

        let (items, effects) = self
            .runtime
            .with_lua_timeout(CALLBACK_TIMEOUT, move |lua| {
                let command = to_lua(lua, &command)?;
                with_effects(lua, || {
                    let value: Value = func.call(lua, (query, command))?;
                    match value {
                        Value::Nil => Ok(None),
                        other => lua.from_value::<Vec<ResultItem>>(other).map(Some),
                    }
                })
            })
            .await?;

        if !effects.is_empty() {
            tracing::warn!(
                "Ignoring {} effects queued by '{}' on_input",
                effects.len(),
                self.spec.meta.name
            );
        }

        Ok(items)
    }

    async fn on_enter(
        &self,
        item: &ResultItem,
        command: &Command,
        query: &str,
        key_status: &KeyStatus,
    ) -> PluginResult<EnterOutcome> {
        let Some(func) = self.spec.on_enter.clone() else {
            return Ok(EnterOutcome::Done);
        };
        let item = item.clone();
        let command = command.clone();
        let query = query.to_string();
        let status = *key_status;

        let (outcome, effects) = self
            .runtime
            .with_lua_timeout(CALLBACK_TIMEOUT, move |lua| {
                let item = to_lua(lua, &item)?;
                let command = to_lua(lua, &command)?;
                let status = to_lua(lua, &status)?;
                with_effects(lua, || {
                    let value: Value = func.call(lua, (item, command, query, status))?;
                    outcome_from_lua(value)
                })
            })
            .await?;

        self.apply_effects(effects, key_status).await?;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::register_steward_api;
    use crate::load_plugins;
    use mockall::mock;
    use mockall::predicate::eq;
    use steward_plugin_api::{HostError, OpenTarget};

    mock! {
        pub TestHost {}

        #[async_trait]
        impl Host for TestHost {
            async fn open_tab(&self, url: &str, target: OpenTarget) -> Result<(), HostError>;
            async fn write_clipboard(&self, text: &str) -> Result<(), HostError>;
            async fn send_runtime_message(&self, action: &str) -> Result<serde_json::Value, HostError>;
            async fn storage_quota_check(&self, key: &str) -> Result<bool, HostError>;
            fn localized(&self, key: &str, substitutions: &[String]) -> String;
        }
    }

    const SCRIPT: &str = r#"
        steward.plugin {
            name = "Echo",
            version = 2,
            commands = {
                { key = "echo", type = "keyword", title = "Echo", allow_batch = true },
            },
            accepts = function(input, command)
                if input == "spin" then
                    local t = os.clock() while os.clock() - t < 0.5 do end
                end
                return command.key == "echo" and input:match("^%d") ~= nil
            end,
            on_input = function(query, command)
                if query == "" then return nil end
                return { { key = "echo", title = query, weight = 1 } }
            end,
            on_enter = function(item, command, query, key_status)
                if item.title == "chain" then return "calc " end
                if key_status.shift_key then return true end
                if item.title == "site" then
                    steward.open("https://example.com")
                    return false
                end
                if item.title == "boom" then error("exploded") end
                steward.copy(item.title)
                return false
            end,
        }
    "#;

    async fn echo_plugin(host: MockTestHost) -> LuaPlugin {
        let lua = Lua::new();
        register_steward_api(&lua).unwrap();
        let runtime = Arc::new(LuaRuntime::new(lua));

        let mut specs = load_plugins(&runtime, "test.lua", SCRIPT).await.unwrap();
        assert_eq!(specs.len(), 1);
        LuaPlugin::new(specs.remove(0), runtime, Arc::new(host))
    }

    fn echo_command() -> Command {
        Command::new("echo", steward_core::CommandType::Keyword)
    }

    #[tokio::test]
    async fn test_on_input_round_trip() {
        let plugin = echo_plugin(MockTestHost::new()).await;
        assert_eq!(plugin.meta().name, "Echo");
        assert_eq!(plugin.commands()[0].key, "echo");

        let items = plugin.on_input("hello", &echo_command()).await.unwrap().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "hello");
        assert_eq!(items[0].weight, 1);

        assert!(plugin.on_input("", &echo_command()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_on_enter_applies_copy() {
        let mut host = MockTestHost::new();
        host.expect_write_clipboard()
            .with(eq("hello"))
            .times(1)
            .returning(|_| Ok(()));
        let plugin = echo_plugin(host).await;

        let outcome = plugin
            .on_enter(
                &ResultItem::new("echo", "hello"),
                &echo_command(),
                "hello",
                &KeyStatus::default(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, EnterOutcome::Done);
    }

    #[tokio::test]
    async fn test_on_enter_open_honors_meta() {
        let mut host = MockTestHost::new();
        host.expect_open_tab()
            .with(eq("https://example.com"), eq(OpenTarget::CurrentTab))
            .times(1)
            .returning(|_, _| Ok(()));
        let plugin = echo_plugin(host).await;

        let outcome = plugin
            .on_enter(
                &ResultItem::new("echo", "site"),
                &echo_command(),
                "site",
                &KeyStatus::meta(),
            )
            .await
            .unwrap();

        assert_eq!(outcome, EnterOutcome::Done);
    }

    #[tokio::test]
    async fn test_on_enter_outcomes() {
        let plugin = echo_plugin(MockTestHost::new()).await;

        let outcome = plugin
            .on_enter(
                &ResultItem::new("echo", "chain"),
                &echo_command(),
                "chain",
                &KeyStatus::default(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, EnterOutcome::Workflow("calc ".to_string()));

        let outcome = plugin
            .on_enter(
                &ResultItem::new("echo", "x"),
                &echo_command(),
                "x",
                &KeyStatus::shift(),
            )
            .await
            .unwrap();
        assert_eq!(outcome, EnterOutcome::Keep);
    }

    #[tokio::test]
    async fn test_on_enter_error_surfaces() {
        let plugin = echo_plugin(MockTestHost::new()).await;

        let err = plugin
            .on_enter(
                &ResultItem::new("echo", "boom"),
                &echo_command(),
                "boom",
                &KeyStatus::default(),
            )
            .await
            .unwrap_err();

        assert!(err.to_string().contains("exploded"));
    }

    #[tokio::test]
    async fn test_accepts_calls_lua() {
        let plugin = echo_plugin(MockTestHost::new()).await;

        assert!(plugin.accepts(&echo_command(), "2+2").await);
        assert!(!plugin.accepts(&echo_command(), "chrome").await);
    }

    #[tokio::test]
    async fn test_slow_accepts_yields_to_other_tasks() {
        let plugin = echo_plugin(MockTestHost::new()).await;

        let command = echo_command();
        let first = tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(50)) => "timer",
            _ = plugin.accepts(&command, "spin") => "accepts",
        };
        assert_eq!(first, "timer");

        assert!(!plugin.accepts(&echo_command(), "spin").await);
    }

    #[test]
    fn test_outcome_from_lua() {
        let lua = Lua::new();
        assert_eq!(outcome_from_lua(Value::Nil).unwrap(), EnterOutcome::Done);
        assert_eq!(outcome_from_lua(Value::Boolean(true)).unwrap(), EnterOutcome::Keep);
        let text = Value::String(lua.create_string("tab ").unwrap());
        assert_eq!(
            outcome_from_lua(text).unwrap(),
            EnterOutcome::Workflow("tab ".to_string())
        );
        assert!(outcome_from_lua(Value::Integer(3)).is_err());
    }
}
