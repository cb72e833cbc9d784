//! # Transactions
//!
//! Every edit is a transaction: a list of steps applied atomically to a
//! working copy of the document. Each step records a [`StepMap`] so that
//! positions held outside the document (the selection) can be carried
//! through the edit.
//!
//! ```text
//! before ──step──▶ doc₁ ──step──▶ doc₂ … ──▶ doc
//!            map₁          map₂             Mapping
//! ```

use crate::document::{Document, ReplaceOutcome};
use crate::error::{DocumentError, DocumentResult};
use crate::segment::Segment;
use crate::selection::Selection;

/// Which side a position sticks to when content is inserted at it
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Assoc {
    Before,
    After,
}

/// Position map for one step: `old_len` positions at `from` became `new_len`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepMap {
    pub from: usize,
    pub old_len: usize,
    pub new_len: usize,
}

impl StepMap {
    pub fn new(from: usize, old_len: usize, new_len: usize) -> Self {
        Self {
            from,
            old_len,
            new_len,
        }
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        let old_end = self.from + self.old_len;
        if pos < self.from || (pos == self.from && self.old_len == 0 && assoc == Assoc::Before) {
            pos
        } else if pos > old_end || (pos == old_end && self.old_len > 0) {
            pos - self.old_len + self.new_len
        } else if pos == self.from && self.old_len > 0 {
            pos
        } else {
            match assoc {
                Assoc::Before => self.from,
                Assoc::After => self.from + self.new_len,
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Mapping {
    maps: Vec<StepMap>,
}

impl Mapping {
    pub fn push(&mut self, map: StepMap) {
        self.maps.push(map);
    }

    pub fn extend(&mut self, other: &Mapping) {
        self.maps.extend(other.maps.iter().copied());
    }

    pub fn map(&self, pos: usize, assoc: Assoc) -> usize {
        self.maps.iter().fold(pos, |pos, map| map.map(pos, assoc))
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Replace {
        from: usize,
        to: usize,
        content: Vec<Segment>,
    },
    SetToken {
        id: String,
        token: Segment,
    },
}

/// How the content of a transaction was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputKind {
    /// Character-by-character typing
    Typing,
    Paste,
    #[default]
    Programmatic,
    /// A value picked from a suggestion list
    SuggestionSelect,
    /// Appended by the repair pipeline
    Repair,
    /// Appended by the validation engine
    Validation,
}

impl InputKind {
    /// Input that confirms a value rather than incrementally building it
    pub fn is_confirming(&self) -> bool {
        matches!(
            self,
            InputKind::Paste | InputKind::Programmatic | InputKind::SuggestionSelect
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryOp {
    Undo,
    Redo,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionMeta {
    pub input: InputKind,
    pub add_to_history: bool,
    pub history: Option<HistoryOp>,
    /// Produced while an IME composition is active
    pub composing: bool,
    /// Request a full validation pass even without changes
    pub force_check: bool,
    pub description: Option<String>,
}

impl Default for TransactionMeta {
    fn default() -> Self {
        Self {
            input: InputKind::default(),
            add_to_history: true,
            history: None,
            composing: false,
            force_check: false,
            description: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    before: Document,
    doc: Document,
    steps: Vec<Step>,
    mapping: Mapping,
    selection: Option<Selection>,
    pub meta: TransactionMeta,
}

impl Transaction {
    pub fn new(doc: &Document) -> Self {
        Self {
            before: doc.clone(),
            doc: doc.clone(),
            steps: Vec::new(),
            mapping: Mapping::default(),
            selection: None,
            meta: TransactionMeta::default(),
        }
    }

    pub fn with_input(mut self, input: InputKind) -> Self {
        self.meta.input = input;
        self
    }

    pub fn without_history(mut self) -> Self {
        self.meta.add_to_history = false;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    /// The document as it was before any step
    pub fn before(&self) -> &Document {
        &self.before
    }

    /// The in-progress document
    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    pub fn doc_changed(&self) -> bool {
        !self.steps.is_empty() && self.doc != self.before
    }

    pub fn selection(&self) -> Option<Selection> {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) -> &mut Self {
        self.selection = Some(selection.clamp(self.doc.size()));
        self
    }

    pub fn replace(
        &mut self,
        from: usize,
        to: usize,
        content: Vec<Segment>,
    ) -> DocumentResult<ReplaceOutcome> {
        let outcome = self.doc.replace(from, to, content.clone())?;
        self.push_map(StepMap::new(
            outcome.from,
            outcome.to - outcome.from,
            outcome.inserted,
        ));
        self.steps.push(Step::Replace {
            from: outcome.from,
            to: outcome.to,
            content,
        });
        Ok(outcome)
    }

    pub fn delete(&mut self, from: usize, to: usize) -> DocumentResult<ReplaceOutcome> {
        self.replace(from, to, Vec::new())
    }

    pub fn insert(&mut self, pos: usize, content: Vec<Segment>) -> DocumentResult<ReplaceOutcome> {
        self.replace(pos, pos, content)
    }

    pub fn insert_text(&mut self, pos: usize, text: &str) -> DocumentResult<ReplaceOutcome> {
        self.replace(pos, pos, vec![Segment::text(text)])
    }

    /// Swap a token for an edited copy; the id must not change
    pub fn set_token(&mut self, token: Segment) -> DocumentResult<()> {
        let id = token
            .token_id()
            .ok_or_else(|| DocumentError::NotAToken(format!("{:?}", token)))?
            .to_string();
        let new_len = token.size();
        let (pos, old_len) = self.doc.set_token(&id, token.clone())?;
        // Interior positions move with the value; the boundaries stay put
        self.push_map(StepMap::new(pos + 1, old_len - 2, new_len - 2));
        self.steps.push(Step::SetToken { id, token });
        Ok(())
    }

    /// Edit a token in place through a closure
    pub fn update_token(&mut self, id: &str, f: impl FnOnce(&mut Segment)) -> DocumentResult<()> {
        let mut token = self
            .doc
            .token(id)
            .cloned()
            .ok_or_else(|| DocumentError::TokenNotFound(id.to_string()))?;
        f(&mut token);
        self.set_token(token)
    }

    /// An explicit selection keeps following later steps
    fn push_map(&mut self, map: StepMap) {
        if let Some(selection) = self.selection {
            let mut step = Mapping::default();
            step.push(map);
            self.selection = Some(selection.map(&step));
        }
        self.mapping.push(map);
    }

    /// Selection after the transaction: the explicit one, or `current` mapped
    pub fn resolve_selection(&self, current: Selection) -> Selection {
        self.selection
            .unwrap_or_else(|| current.map(&self.mapping))
            .clamp(self.doc.size())
    }

    /// Continue editing from this transaction's result
    pub fn follow_up(&self) -> Transaction {
        Transaction::new(&self.doc)
    }

    pub fn into_doc(self) -> Document {
        self.doc
    }
}
