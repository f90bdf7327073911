//! Built-in plugins for the Steward launcher.

pub mod calculate;
pub mod chrome;
pub mod components;

use steward_plugin_api::PluginFactory;

pub use calculate::Calculator;
pub use chrome::ChromePages;
pub use components::{Component, ComponentManager};

/// Factories for every built-in plugin, in registration order.
pub fn builtin_factories() -> Vec<PluginFactory> {
    vec![calculate::factory, chrome::factory, components::factory]
}


#[cfg(test)]
mod tests {
    use super::*;
    use steward_plugin_api::{EngineContext, PluginRegistry};

    #[test]
    fn test_builtins_register() {
        let ctx = EngineContext::headless();
        let mut registry = PluginRegistry::new();
        registry.register_factories(&ctx, &builtin_factories()).unwrap();

        assert_eq!(registry.plugin_count(), 3);
        assert!(registry.resolve("calc").is_some());
        assert!(registry.resolve("show").is_some());
        assert_eq!(registry.always().len(), 1);
        assert_eq!(registry.fallback().len(), 1);
    }
}
