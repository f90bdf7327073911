//! Engine context passed to plugin factories, the registry and the engine.

use std::sync::Arc;
use std::time::Duration;

use steward_core::AppConfig;

use crate::batch::BatchExecutor;
use crate::host::{Host, NullHost};
use crate::ranking::RankedMatcher;

/// Explicit session context.
///
/// Replaces an ambient global application object: everything a component
/// needs from its surroundings is reachable from here.
pub struct EngineContext {
    host: Arc<dyn Host>,
    config: AppConfig,
    ranker: RankedMatcher,
}

impl EngineContext {
    pub fn new(host: Arc<dyn Host>, config: AppConfig) -> Self {
        Self {
            host,
            config,
            ranker: RankedMatcher::new(),
        }
    }

    /// A context with a [`NullHost`] and default config.
    pub fn headless() -> Self {
        Self::new(Arc::new(NullHost), AppConfig::default())
    }

    pub fn host(&self) -> &Arc<dyn Host> {
        &self.host
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// The session's ranking matcher (its transliteration cache lives here).
    pub fn ranker(&self) -> &RankedMatcher {
        &self.ranker
    }

    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.config.general.delay_ms)
    }

    pub fn batch_executor(&self) -> BatchExecutor {
        BatchExecutor::new(self.config.general.max_operands)
    }
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
