//! Undo/redo history for a single workflow
//!
//! Each entry is a zstd-compressed JSON snapshot of the whole workflow,
//! recorded after a structural edit. Restoring a snapshot replaces the
//! workflow wholesale, so no edit needs an inverse operation.

use std::collections::VecDeque;

use crate::constants::limits;
use crate::error::{Result, WorkflowError};
use crate::types::Workflow;

const COMPRESSION_LEVEL: i32 = 3;

/// Snapshot history with a cursor at the current state
#[derive(Debug)]
pub struct UndoStack {
    /// Compressed workflow states, oldest first
    snapshots: VecDeque<Vec<u8>>,
    /// Index of the snapshot matching the live workflow
    cursor: usize,
    max_snapshots: usize,
}

impl UndoStack {
    /// Create a history keeping at most `max_snapshots` states
    pub fn new(max_snapshots: usize) -> Self {
        Self {
            snapshots: VecDeque::new(),
            cursor: 0,
            max_snapshots: max_snapshots.max(1),
        }
    }

    /// Record the current state, discarding any redo states
    pub fn record(&mut self, workflow: &Workflow) -> Result<()> {
        let compressed = compress(workflow)?;

        self.snapshots.truncate(self.cursor + 1);
        self.snapshots.push_back(compressed);
        self.cursor = self.snapshots.len() - 1;

        while self.snapshots.len() > self.max_snapshots {
            self.snapshots.pop_front();
            self.cursor = self.cursor.saturating_sub(1);
        }
        Ok(())
    }

    /// Overwrite the state at the cursor with `workflow`
    ///
    /// Folds in edits that were made since the last snapshot without
    /// recording one of their own.
    pub fn replace_current(&mut self, workflow: &Workflow) -> Result<()> {
        let compressed = compress(workflow)?;
        match self.snapshots.get_mut(self.cursor) {
            Some(slot) => *slot = compressed,
            None => self.snapshots.push_back(compressed),
        }
        Ok(())
    }

    /// Step back one state
    pub fn undo(&mut self) -> Option<Result<Workflow>> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        Some(self.restore(self.cursor))
    }

    /// Step forward one state
    pub fn redo(&mut self) -> Option<Result<Workflow>> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        Some(self.restore(self.cursor))
    }

    /// The state at the cursor
    pub fn current(&self) -> Option<Result<Workflow>> {
        if self.snapshots.is_empty() {
            None
        } else {
            Some(self.restore(self.cursor))
        }
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Total compressed size of all snapshots, in bytes
    pub fn compressed_size(&self) -> usize {
        self.snapshots.iter().map(Vec::len).sum()
    }

    fn restore(&self, index: usize) -> Result<Workflow> {
        let json = zstd::decode_all(&self.snapshots[index][..])
            .map_err(|e| WorkflowError::Compression(e.to_string()))?;
        Ok(serde_json::from_slice(&json)?)
    }
}

impl Default for UndoStack {
    fn default() -> Self {
        Self::new(limits::UNDO_SNAPSHOTS)
    }
}

fn compress(workflow: &Workflow) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(workflow)?;
    zstd::encode_all(&json[..], COMPRESSION_LEVEL)
        .map_err(|e| WorkflowError::Compression(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::WorkflowScope;

    fn named(name: &str) -> Workflow {
        let mut workflow = Workflow::with_start_node(name, WorkflowScope::Client);
        workflow.id = "w1".to_string();
        workflow
    }

    #[test]
    fn test_undo_walks_back() {
        let mut stack = UndoStack::new(10);
        stack.record(&named("first")).unwrap();
        stack.record(&named("second")).unwrap();
        stack.record(&named("third")).unwrap();

        assert_eq!(stack.current().unwrap().unwrap().name, "third");
        assert_eq!(stack.undo().unwrap().unwrap().name, "second");
        assert_eq!(stack.undo().unwrap().unwrap().name, "first");
        assert!(stack.undo().is_none());
    }

    #[test]
    fn test_redo_after_undo() {
        let mut stack = UndoStack::new(10);
        stack.record(&named("first")).unwrap();
        stack.record(&named("second")).unwrap();

        stack.undo();
        assert_eq!(stack.redo().unwrap().unwrap().name, "second");
        assert!(stack.redo().is_none());
    }

    #[test]
    fn test_record_discards_redo_states() {
        let mut stack = UndoStack::new(10);
        stack.record(&named("first")).unwrap();
        stack.record(&named("second")).unwrap();
        stack.undo();

        stack.record(&named("third")).unwrap();
        assert!(!stack.can_redo());
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.undo().unwrap().unwrap().name, "first");
    }

    #[test]
    fn test_oldest_snapshots_are_trimmed() {
        let mut stack = UndoStack::new(3);
        for i in 0..5 {
            stack.record(&named(&format!("wf_{}", i))).unwrap();
        }

        assert_eq!(stack.len(), 3);
        assert_eq!(stack.current().unwrap().unwrap().name, "wf_4");
        stack.undo();
        assert_eq!(stack.undo().unwrap().unwrap().name, "wf_2");
        assert!(!stack.can_undo());
    }

    #[test]
    fn test_replace_current_keeps_redo_states() {
        let mut stack = UndoStack::new(10);
        stack.record(&named("first")).unwrap();
        stack.record(&named("second")).unwrap();
        stack.undo();

        stack.replace_current(&named("first, renamed")).unwrap();
        assert_eq!(stack.len(), 2);
        assert!(stack.can_redo());
        assert_eq!(stack.redo().unwrap().unwrap().name, "second");
        assert_eq!(stack.undo().unwrap().unwrap().name, "first, renamed");
    }

    #[test]
    fn test_replace_current_on_empty_history() {
        let mut stack = UndoStack::new(10);
        stack.replace_current(&named("only")).unwrap();

        assert_eq!(stack.len(), 1);
        assert!(!stack.can_undo());
        assert_eq!(stack.current().unwrap().unwrap().name, "only");
    }

    #[test]
    fn test_snapshot_preserves_graph() {
        let workflow = named("graph");
        let mut stack = UndoStack::default();
        stack.record(&workflow).unwrap();

        assert!(stack.compressed_size() > 0);
        assert_eq!(stack.current().unwrap().unwrap(), workflow);
    }
}
