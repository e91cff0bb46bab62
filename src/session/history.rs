use std::collections::VecDeque;

/// Bounded linear undo/redo history of whole-state snapshots.
///
/// Recording a new state clears the redo stack; the oldest entries are dropped once `depth`
/// is exceeded. A depth of 0 disables history.
#[derive(Clone, Debug)]
pub struct History<T> {
    undo_stack: VecDeque<T>,
    redo_stack: Vec<T>,
    depth: usize,
}

impl<T> History<T> {
    pub fn new(depth: usize) -> Self {
        Self {
            undo_stack: VecDeque::new(),
            redo_stack: Vec::new(),
            depth,
        }
    }

    /// Remember `previous` as the state before a mutation.
    pub fn record(&mut self, previous: T) {
        self.redo_stack.clear();
        if self.depth == 0 {
            return;
        }
        self.undo_stack.push_back(previous);
        while self.undo_stack.len() > self.depth {
            self.undo_stack.pop_front();
        }
    }

    /// Step back: returns the state to restore and keeps `current` for redo.
    pub fn undo(&mut self, current: T) -> Option<T> {
        let prev = self.undo_stack.pop_back()?;
        self.redo_stack.push(current);
        Some(prev)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: T) -> Option<T> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push_back(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/history.rs"]
mod tests;
