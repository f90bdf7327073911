//! Command engine
//!
//! The engine owns the session state and drives the interaction:
//!
//! ```text
//! keystroke ──► Typing ──(debounce)──► matcher pass ──► Resolved
//!                                                          │ enter
//!                                                          ▼
//!                                                      Executing
//!                                  ┌──────────────┬────────┴────────┬──────────────┐
//!                                  ▼              ▼                 ▼              ▼
//!                                Done           Keep            Workflow         error
//!                                  │              │                 │              │
//!                                Idle      re-run the pass    push, lock the   Resolved,
//!                                                             chained command  results kept
//! ```
//!
//! ## Staleness
//!
//! Every transition that supersedes the visible content bumps a generation
//! counter. A matcher pass records the generation and input it started with
//! and is dropped on arrival if either moved on. Passes are never aborted
//! once dispatched; only the debounce wait is.
//!
//! ## Reactive State
//!
//! Subscribe via `subscribe()`. Every mutation that changes visible content
//! also broadcasts a [`Snapshot`].

use std::sync::Arc;

use parking_lot::Mutex;
use steward_core::{CommandType, EngineError, KeyStatus, ResultItem};
use tokio::sync::watch;

use crate::batch::{BatchExecutor, Selection};
use crate::context::EngineContext;
use crate::matcher::{CommandMatcher, Resolution};
use crate::plugin::EnterOutcome;
use crate::registry::{PluginRegistry, RegisteredCommand};

mod debounce;
mod state;

pub use debounce::Debouncer;
pub use state::{Snapshot, Stage};
use state::AppState;

// =============================================================================
// Engine
// =============================================================================

/// The application state machine. Cheap to clone.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Inner>,
}

struct Inner {
    ctx: Arc<EngineContext>,
    matcher: CommandMatcher,
    batch: BatchExecutor,

    /// Never held across an `.await`.
    state: Mutex<AppState>,

    debounce: Debouncer,
    tx: watch::Sender<Snapshot>,
}

impl Engine {
    pub fn new(ctx: Arc<EngineContext>, registry: Arc<PluginRegistry>) -> Self {
        let matcher = CommandMatcher::new(registry, ctx.ranker().clone());
        let batch = ctx.batch_executor();
        let (tx, _rx) = watch::channel(Snapshot::default());

        Self {
            inner: Arc::new(Inner {
                ctx,
                matcher,
                batch,
                state: Mutex::new(AppState::default()),
                debounce: Debouncer::new(),
                tx,
            }),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.inner.tx.subscribe()
    }

    /// The most recently published snapshot.
    pub fn snapshot(&self) -> Snapshot {
        self.inner.tx.borrow().clone()
    }

    pub fn stage(&self) -> Stage {
        self.inner.state.lock().stage
    }

    pub fn context(&self) -> &Arc<EngineContext> {
        &self.inner.ctx
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        self.inner.matcher.registry()
    }

    // =========================================================================
    // Typing
    // =========================================================================

    /// A keystroke: `text` is the whole input after the edit.
    ///
    /// Must be called within a tokio runtime.
    pub fn input(&self, text: &str) {
        let generation = {
            let mut state = self.inner.state.lock();
            if text.is_empty() && !state.locked {
                state.clear();
                self.inner.publish(&state);
                None
            } else {
                state.input = text.to_string();
                state.error = None;
                state.stage = Stage::Typing;
                let generation = state.bump();
                self.inner.publish(&state);
                Some(generation)
            }
        };

        match generation {
            Some(generation) => {
                let pass = Arc::clone(&self.inner).pass(generation, text.to_string());
                self.inner.debounce.schedule(self.inner.ctx.delay(), pass);
            }
            None => {
                self.inner.debounce.cancel();
                tracing::debug!("Input cleared, back to idle");
            }
        }
    }

    /// Skip the debounce wait and run the pass for the current input now.
    pub async fn search_now(&self) {
        self.inner.debounce.cancel();

        let pending = {
            let mut state = self.inner.state.lock();
            if state.input.is_empty() && !state.locked {
                None
            } else {
                Some((state.bump(), state.input.clone()))
            }
        };

        if let Some((generation, input)) = pending {
            Arc::clone(&self.inner).pass(generation, input).await;
        }
    }

    /// Update the held modifiers. With shift held on a batch command the
    /// snapshot marks the items a batch would act on.
    pub fn set_key_status(&self, key_status: KeyStatus) {
        let mut state = self.inner.state.lock();
        if state.key_status != key_status {
            state.key_status = key_status;
            self.inner.publish(&state);
        }
    }

    // =========================================================================
    // Selection
    // =========================================================================

    /// Act on the visible item at `index`.
    pub async fn enter(
        &self,
        index: usize,
        key_status: KeyStatus,
    ) -> Result<EnterOutcome, EngineError> {
        let (selected, visible, query, previous, generation) = {
            let mut state = self.inner.state.lock();
            if !matches!(state.stage, Stage::Resolved | Stage::Workflow) {
                return Err(EngineError::NotReady(format!("{:?}", state.stage)));
            }

            let selected = state
                .results
                .get(index)
                .cloned()
                .ok_or(EngineError::NoSelection(index))?;

            if selected.item.is_default {
                tracing::debug!("Default item entered, nothing to do");
                return Ok(EnterOutcome::Keep);
            }

            let visible: Vec<ResultItem> = state
                .results
                .iter()
                .filter(|m| Arc::ptr_eq(&m.source, &selected.source))
                .map(|m| m.item.clone())
                .collect();

            let previous = state.stage;
            state.stage = Stage::Executing;
            state.key_status = key_status;
            let generation = state.bump();
            self.inner.publish(&state);

            (selected, visible, state.query.clone(), previous, generation)
        };
        self.inner.debounce.cancel();

        let source = selected.source;
        let predicate = key_status.shift_key && source.command().supports_batch();
        let selection = if predicate {
            Selection::Many(visible)
        } else {
            Selection::Single(selected.item)
        };

        let report = self
            .inner
            .batch
            .decide(
                predicate,
                selection,
                key_status,
                |item| {
                    let source = Arc::clone(&source);
                    let query = query.clone();
                    async move {
                        source
                            .plugin()
                            .on_enter(&item, source.command(), &query, &key_status)
                            .await
                    }
                },
                |item, status| {
                    let source = Arc::clone(&source);
                    let query = query.clone();
                    async move {
                        source
                            .plugin()
                            .on_enter(&item, source.command(), &query, &status)
                            .await
                    }
                },
            )
            .await;

        let outcome = if report.batched {
            let errors: Vec<String> = report
                .results
                .iter()
                .filter_map(|r| r.as_ref().err())
                .map(|e| e.to_string())
                .collect();
            for error in &errors {
                tracing::warn!("Batch element failed in '{}': {}", source.plugin_name(), error);
            }

            if !report.results.is_empty() && report.succeeded() == 0 {
                Err(errors.join("; "))
            } else {
                Ok(EnterOutcome::Done)
            }
        } else {
            report
                .results
                .into_iter()
                .next()
                .unwrap_or(Ok(EnterOutcome::Done))
                .map_err(|e| e.to_string())
        };

        // A keystroke while the action ran owns the input and results now.
        let superseded = self.inner.state.lock().generation != generation;
        if superseded {
            tracing::debug!("Input changed while '{}' ran", source.reference());
        }

        match outcome {
            Ok(EnterOutcome::Done) => {
                let mut state = self.inner.state.lock();
                if state.generation != generation {
                    state.workflow.clear();
                } else {
                    state.clear();
                    self.inner.ctx.ranker().clear_cache();
                    tracing::debug!("'{}' finished, back to idle", source.reference());
                }
                self.inner.publish(&state);
                Ok(EnterOutcome::Done)
            }
            Ok(EnterOutcome::Keep) => {
                if !superseded {
                    self.inner.state.lock().stage = previous;
                    self.search_now().await;
                }
                Ok(EnterOutcome::Keep)
            }
            Ok(EnterOutcome::Workflow(text)) => {
                if !superseded {
                    self.chain(&source, &text).await;
                }
                Ok(EnterOutcome::Workflow(text))
            }
            Err(message) => {
                let error = EngineError::PluginExecution {
                    plugin: source.plugin_name().to_string(),
                    message,
                };
                tracing::warn!("{}", error);

                let mut state = self.inner.state.lock();
                if state.generation == generation {
                    state.stage = Stage::Resolved;
                }
                state.error = Some(error.to_string());
                self.inner.publish(&state);
                Err(error)
            }
        }
    }

    /// Chain from `leaving` into the command named by `text`.
    async fn chain(&self, leaving: &Arc<RegisteredCommand>, text: &str) {
        let (command, query) = match self.inner.matcher.resolve(text).await {
            Resolution::Keyword { command, query } => (command, query),
            _ => {
                tracing::debug!("Workflow text '{}' names no command, treating as input", text);
                self.inner.state.lock().stage = Stage::Resolved;
                self.input(text);
                return;
            }
        };

        let generation = {
            let mut state = self.inner.state.lock();
            state.workflow.push(leaving.reference().clone());
            state.locked = true;
            state.set_command(Some(Arc::clone(&command)));
            state.input = query.clone();
            state.query = query.clone();
            state.results.clear();
            state.error = None;
            state.stage = Stage::Workflow;
            let generation = state.bump();
            self.inner.publish(&state);
            generation
        };
        tracing::debug!("Chained from '{}' into '{}'", leaving.reference(), command.reference());

        Arc::clone(&self.inner).pass(generation, query).await;
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    /// Backspace on an empty input.
    ///
    /// Pops one workflow level and restores the command that was left. When
    /// the stack empties and that command is a keyword, its input becomes
    /// `"{key} "`. Returns false when there is nothing to pop.
    pub async fn backspace(&self) -> bool {
        let (generation, input) = {
            let mut state = self.inner.state.lock();
            if !state.input.is_empty() {
                return false;
            }

            let reference = match state.workflow.pop() {
                Some(reference) => reference,
                None if state.locked => {
                    state.clear();
                    self.inner.publish(&state);
                    return true;
                }
                None => return false,
            };

            let Some(command) = self.inner.matcher.registry().lookup(&reference) else {
                tracing::warn!("Workflow entry '{}' no longer resolves", reference);
                state.clear();
                self.inner.publish(&state);
                return true;
            };

            if state.workflow.is_empty() && command.command_type() == CommandType::Keyword {
                state.locked = false;
                state.input = format!("{} ", command.command().key);
            } else {
                state.locked = true;
                state.input.clear();
            }

            state.set_command(Some(command));
            state.query.clear();
            state.results.clear();
            state.error = None;
            state.stage = Stage::Resolved;
            let generation = state.bump();
            self.inner.publish(&state);
            (generation, state.input.clone())
        };
        self.inner.debounce.cancel();

        Arc::clone(&self.inner).pass(generation, input).await;
        true
    }

    /// End the session: drop everything and return to idle.
    pub fn reset(&self) {
        self.inner.debounce.cancel();
        let mut state = self.inner.state.lock();
        state.clear();
        state.key_status = KeyStatus::default();
        self.inner.ctx.ranker().clear_cache();
        self.inner.publish(&state);
    }
}

impl Inner {
    fn publish(&self, state: &AppState) {
        self.tx.send_replace(state.snapshot(&self.batch));
    }

    /// One matcher pass. Applied only if nothing superseded it meanwhile.
    async fn pass(self: Arc<Self>, generation: u64, input: String) {
        let target = {
            let state = self.state.lock();
            if state.generation != generation {
                return;
            }
            state.locked_command()
        };

        let result = match &target {
            Some(command) => self.matcher.run_command(command, &input).await,
            None => self.matcher.run(&input).await,
        };

        let mut state = self.state.lock();
        if state.generation != generation || state.input != input {
            tracing::debug!("Discarding stale results for '{}'", input);
            return;
        }

        tracing::debug!("Applying {} results for '{}'", result.items.len(), input);
        state.apply(result);
        self.publish(&state);
    }
}

// =============================================================================
// Tests
// =============================================================================
