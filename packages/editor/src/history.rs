//! # Undo/Redo History
//!
//! Snapshot-based: each entry keeps the document and selection before and
//! after the change. Undo restores `before`, redo restores `after`.
//!
//! - New entries clear the redo stack
//! - Batches group several changes into one undo step
//! - Housekeeping transactions never reach the history
//!
//! ## Example
//!
//! ```rust,ignore
//! let mut history = History::new();
//! history.record(HistoryEntry::new(before, after, sel_before, sel_after));
//!
//! let entry = history.undo().cloned();
//! ```

use querybar_document::{Document, Selection};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub before: Document,
    pub after: Document,
    pub selection_before: Selection,
    pub selection_after: Selection,
    pub description: Option<String>,
}

impl HistoryEntry {
    pub fn new(before: Document, after: Document, selection_before: Selection, selection_after: Selection) -> Self {
        Self {
            before,
            after,
            selection_before,
            selection_after,
            description: None,
        }
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    /// Fold a later change into this entry
    fn absorb(&mut self, later: HistoryEntry) {
        self.after = later.after;
        self.selection_after = later.selection_after;
        if self.description.is_none() {
            self.description = later.description;
        }
    }
}

#[derive(Debug)]
pub struct History {
    /// Most recent last
    undo_stack: Vec<HistoryEntry>,

    /// Most recently undone last
    redo_stack: Vec<HistoryEntry>,

    /// 0 = unlimited
    max_levels: usize,

    current_batch: Option<HistoryEntry>,
    batching: bool,
    batch_description: Option<String>,
}

impl History {
    pub fn new() -> Self {
        Self::with_max_levels(100)
    }

    pub fn with_max_levels(max_levels: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_levels,
            current_batch: None,
            batching: false,
            batch_description: None,
        }
    }

    pub fn record(&mut self, entry: HistoryEntry) {
        if !self.batching {
            self.push_entry(entry);
            return;
        }
        match &mut self.current_batch {
            Some(batch) => batch.absorb(entry),
            None => self.current_batch = Some(entry),
        }
    }

    /// Start grouping changes into one undo step
    pub fn begin_batch(&mut self) {
        self.batching = true;
        self.current_batch = None;
        self.batch_description = None;
    }

    pub fn end_batch(&mut self) {
        self.batching = false;
        if let Some(mut batch) = self.current_batch.take() {
            if let Some(description) = self.batch_description.take() {
                batch.description = Some(description);
            }
            if batch.before != batch.after {
                self.push_entry(batch);
            }
        }
    }

    pub fn set_batch_description(&mut self, description: impl Into<String>) {
        if self.batching {
            self.batch_description = Some(description.into());
        }
    }

    fn push_entry(&mut self, entry: HistoryEntry) {
        self.undo_stack.push(entry);

        if self.max_levels > 0 && self.undo_stack.len() > self.max_levels {
            self.undo_stack.remove(0);
        }

        self.redo_stack.clear();
    }

    /// Move the latest entry to the redo stack; restore its `before`
    pub fn undo(&mut self) -> Option<&HistoryEntry> {
        self.end_batch();
        let entry = self.undo_stack.pop()?;
        self.redo_stack.push(entry);
        self.redo_stack.last()
    }

    /// Move the latest undone entry back; restore its `after`
    pub fn redo(&mut self) -> Option<&HistoryEntry> {
        let entry = self.redo_stack.pop()?;
        self.undo_stack.push(entry);
        self.undo_stack.last()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn max_levels(&self) -> usize {
        self.max_levels
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.current_batch = None;
        self.batching = false;
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.undo_stack.last().and_then(|entry| entry.description.as_deref())
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.redo_stack.last().and_then(|entry| entry.description.as_deref())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}
