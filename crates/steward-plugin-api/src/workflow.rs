//! Workflow stack.
//!
//! Each entry is the serialized reference of a command context the user
//! chained out of. Depth equals the number of nested contexts; popping an
//! empty stack is a no-op.

use steward_core::CommandRef;

#[derive(Debug, Default, Clone)]
pub struct WorkflowStack {
    entries: Vec<CommandRef>,
}

impl WorkflowStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, reference: CommandRef) {
        self.entries.push(reference);
        tracing::debug!("Pushed workflow entry, depth: {}", self.entries.len());
    }

    /// Pop the most recent entry. Returns `None` on an empty stack.
    pub fn pop(&mut self) -> Option<CommandRef> {
        let popped = self.entries.pop();
        if popped.is_some() {
            tracing::debug!("Popped workflow entry, depth: {}", self.entries.len());
        }
        popped
    }

    pub fn peek(&self) -> Option<&CommandRef> {
        self.entries.last()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn depth(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
