//! Engine state and the snapshot it publishes.

use std::sync::Arc;

use serde::Serialize;
use steward_core::{Command, KeyStatus, ResultItem};

use crate::batch::BatchExecutor;
use crate::matcher::{MatchResult, MatchedItem};
use crate::registry::RegisteredCommand;
use crate::workflow::WorkflowStack;

/// Interaction stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Idle,
    Typing,
    Resolved,
    Executing,
    Workflow,
}

/// What the UI renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Snapshot {
    pub stage: Stage,
    pub input: String,
    pub command: Option<Command>,
    pub query: String,
    pub items: Vec<ResultItem>,
    pub workflow_depth: usize,
    pub error: Option<String>,
}

/// The single mutable session state. Only the engine touches it.
#[derive(Debug, Default)]
pub(crate) struct AppState {
    pub stage: Stage,

    /// Raw input text.
    pub input: String,

    /// Key of the resolved command.
    pub cmd: Option<String>,

    /// Input remainder after the command token.
    pub query: String,

    pub command: Option<Arc<RegisteredCommand>>,

    /// Set while a chained command owns the input.
    pub locked: bool,

    pub workflow: WorkflowStack,
    pub key_status: KeyStatus,

    /// Bumped whenever visible content must stop accepting older passes.
    pub generation: u64,

    pub results: Vec<MatchedItem>,
    pub error: Option<String>,
}

impl AppState {
    pub fn bump(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// The command that owns the input in workflow mode.
    pub fn locked_command(&self) -> Option<Arc<RegisteredCommand>> {
        if self.locked {
            self.command.clone()
        } else {
            None
        }
    }

    pub fn set_command(&mut self, command: Option<Arc<RegisteredCommand>>) {
        self.cmd = command.as_ref().map(|c| c.command().key.clone());
        self.command = command;
    }

    /// Install a matcher pass as the visible content.
    pub fn apply(&mut self, result: MatchResult) {
        self.set_command(result.command);
        self.query = result.query;
        self.results = result.items;
        self.error = None;
        self.stage = if self.locked {
            Stage::Workflow
        } else {
            Stage::Resolved
        };
    }

    /// Back to idle: no command, no results, empty stack.
    pub fn clear(&mut self) {
        self.stage = Stage::Idle;
        self.input.clear();
        self.query.clear();
        self.set_command(None);
        self.locked = false;
        self.workflow.clear();
        self.results.clear();
        self.error = None;
        self.bump();
    }

    pub fn snapshot(&self, batch: &BatchExecutor) -> Snapshot {
        let mut items: Vec<ResultItem> = self.results.iter().map(|m| m.item.clone()).collect();

        let batching = self.key_status.shift_key
            && self
                .command
                .as_ref()
                .is_some_and(|c| c.command().supports_batch());
        if batching {
            batch.mark_operands(&mut items);
        }

        Snapshot {
            stage: self.stage,
            input: self.input.clone(),
            command: self.command.as_ref().map(|c| c.command().clone()),
            query: self.query.clone(),
            items,
            workflow_depth: self.workflow.depth(),
            error: self.error.clone(),
        }
    }
}
