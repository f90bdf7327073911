//! Effects queued by Lua callbacks.
//!
//! Callbacks never touch the host directly. `steward.copy` and friends push
//! an [`Effect`] into the collector installed for the call; the plugin
//! adapter applies them through the host after the callback returns.

use std::cell::RefCell;

use mlua::Lua;
use serde::{Deserialize, Serialize};

/// A host operation requested by a Lua callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    /// Write text to the clipboard.
    Copy(String),

    /// Open a URL, honoring the modifier keys of the selection.
    Open(String),

    /// Open a URL in a background tab.
    OpenInBackground(String),

    /// Send an action to the host runtime.
    Message(String),
}

/// Accumulator for effects during one Lua callback.
///
/// Lives in Lua app data for the duration of one callback; the Lua thread
/// is the only writer.
#[derive(Debug, Default)]
pub struct EffectCollector {
    effects: RefCell<Vec<Effect>>,
}

impl EffectCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, effect: Effect) {
        self.effects.borrow_mut().push(effect);
    }

    /// Effects in the order the script queued them.
    pub fn take(self) -> Vec<Effect> {
        self.effects.into_inner()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.borrow().is_empty()
    }

    pub fn len(&self) -> usize {
        self.effects.borrow().len()
    }
}

/// Queue an effect on the collector of the running callback.
pub(crate) fn collect(lua: &Lua, effect: Effect) -> mlua::Result<()> {
    let collector = lua.app_data_ref::<EffectCollector>().ok_or_else(|| {
        mlua::Error::RuntimeError("steward effects are only available inside plugin callbacks".into())
    })?;
    collector.push(effect);
    Ok(())
}

/// Run `f` with a fresh collector installed and return what it queued.
pub fn with_effects<R>(lua: &Lua, f: impl FnOnce() -> mlua::Result<R>) -> mlua::Result<(R, Vec<Effect>)> {
    lua.set_app_data(EffectCollector::new());
    let result = f();
    let effects = lua
        .remove_app_data::<EffectCollector>()
        .map(EffectCollector::take)
        .unwrap_or_default();
    Ok((result?, effects))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collector_keeps_order() {
        let collector = EffectCollector::new();
        assert!(collector.is_empty());

        collector.push(Effect::Copy("4".to_string()));
        collector.push(Effect::Open("https://example.com".to_string()));
        assert_eq!(collector.len(), 2);

        let effects = collector.take();
        assert_eq!(effects[0], Effect::Copy("4".to_string()));
    }

    #[test]
    fn test_with_effects_scopes_collector() {
        let lua = Lua::new();

        let (value, effects) = with_effects(&lua, || {
            collect(&lua, Effect::Message("tabs".to_string()))?;
            Ok(7)
        })
        .unwrap();

        assert_eq!(value, 7);
        assert_eq!(effects, vec![Effect::Message("tabs".to_string())]);
        assert!(collect(&lua, Effect::Copy("late".to_string())).is_err());
    }
}
