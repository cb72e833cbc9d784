//! # Query Editor
//!
//! Owns the document and runs every edit through the same cycle:
//!
//! ```text
//!   user op ─► transaction ─► repair ─► history ─► apply ─► validate
//!                                                              │
//!                 events ◄── follow-up transactions ◄──────────┘
//! ```
//!
//! Validation follow-ups are applied in order. When one of them deleted
//! tokens, a single repair pass runs afterwards without touching history.

use crate::config::EditorConfig;
use crate::errors::{EditorError, EditorResult};
use crate::events::{committed_tokens, CommittedToken, EditorEvent};
use crate::focus::{EntryDirection, EscapeOutcome, FocusPolicy, FocusState};
use crate::history::{History, HistoryEntry};
use crate::keyboard::{boundary_delete, detect_colon_trigger, Key, KeyEvent};
use crate::repair::{RepairContext, RepairPipeline};
use crate::selection_guard::{
    collapse_range, enforce_selection_invariant, extend_selection, get_cursor_inside_token, next_stop,
    resolve_cursor_inside_token, GuardAction,
};
use crate::tokenize::AutoTokenizer;
use querybar_document::{
    parse, serialize, Document, DocumentError, FieldRegistry, FilterToken, HistoryOp, IdGenerator, InputKind,
    ParseOptions, Segment, Selection, Snapshot, Transaction,
};
use querybar_validation::{RuleRegistry, ValidationEngine, ValidationInput, ValidationOutcome, Violation};
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Move both ends of a selection out of token interiors
fn snap_selection(doc: &Document, selection: Selection) -> Selection {
    let selection = selection.clamp(doc.size());
    let snap = |pos: usize| match doc.token_containing(pos) {
        Some(location) if pos - location.pos <= location.end() - pos => location.pos,
        Some(location) => location.end(),
        None => pos,
    };
    Selection::new(snap(selection.anchor), snap(selection.head))
}

fn value_len(doc: &Document, id: &str) -> usize {
    doc.token(id)
        .and_then(Segment::token_value)
        .map_or(0, |value| value.chars().count())
}

pub struct QueryEditor {
    config: EditorConfig,
    delimiter: char,
    fields: FieldRegistry,
    validator: ValidationEngine,
    repair: RepairPipeline,
    history: History,
    ids: IdGenerator,
    doc: Document,
    selection: Selection,
    focus: FocusState,
    tokenizer: AutoTokenizer,
    /// Document as it was when the IME composition started
    composition_base: Option<Document>,
    dragging: bool,
    editor_focused: bool,
    events: Vec<EditorEvent>,
    last_token_set: Vec<CommittedToken>,
    violations: Vec<Violation>,
}

impl QueryEditor {
    pub fn new(config: EditorConfig) -> EditorResult<Self> {
        Self::with_rules(config, RuleRegistry::new())
    }

    /// Build an editor with programmatic rules in addition to the ones
    /// declared in the configuration
    pub fn with_rules(config: EditorConfig, mut rules: RuleRegistry) -> EditorResult<Self> {
        let delimiter = config.delimiter_char()?;
        for spec in &config.validation.rules {
            rules.add_rule(spec.build()?);
        }

        let tokenizer = AutoTokenizer::new(
            config.free_text_mode,
            delimiter,
            Duration::from_millis(config.tokenize_debounce_ms),
        );

        Ok(Self {
            delimiter,
            fields: config.field_registry(),
            validator: ValidationEngine::new(rules),
            repair: RepairPipeline::new(),
            history: History::with_max_levels(config.history_depth),
            ids: IdGenerator::default(),
            doc: Document::new(),
            selection: Selection::default(),
            focus: FocusState::default(),
            tokenizer,
            composition_base: None,
            dragging: false,
            editor_focused: false,
            events: Vec::new(),
            last_token_set: Vec::new(),
            violations: Vec::new(),
            config,
        })
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn focus(&self) -> &FocusState {
        &self.focus
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Violations found by the latest validation pass
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn is_composing(&self) -> bool {
        self.composition_base.is_some()
    }

    pub fn is_editor_focused(&self) -> bool {
        self.editor_focused
    }

    pub fn has_pending_tokenize(&self) -> bool {
        self.tokenizer.is_pending()
    }

    pub fn value(&self) -> String {
        serialize(&self.doc, self.delimiter)
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot::from_document(&self.doc, self.delimiter)
    }

    pub fn drain_events(&mut self) -> Vec<EditorEvent> {
        std::mem::take(&mut self.events)
    }

    /// Start a transaction against the current document
    pub fn transaction(&self) -> Transaction {
        let mut tr = Transaction::new(&self.doc);
        tr.meta.composing = self.is_composing();
        tr
    }

    /// Apply a caller-built transaction. It must start from the current
    /// document.
    pub fn dispatch(&mut self, tr: Transaction) -> EditorResult<()> {
        if tr.before() != &self.doc {
            return Err(EditorError::StaleTransaction);
        }
        let old = self.focused_id();
        self.commit(tr, old);
        Ok(())
    }

    /// Replace the whole document with a parsed query. History starts over.
    pub fn set_value(&mut self, value: &str) -> EditorResult<()> {
        let options = ParseOptions::new(self.delimiter)
            .with_mode(self.tokenizer.mode())
            .with_fields(&self.fields);
        let parsed = parse(value, &options, &mut self.ids);

        let old = self.focus.blur();
        self.tokenizer.cancel();
        let mut tr = Transaction::new(&self.doc).without_history();
        tr.meta.force_check = true;
        tr.replace(0, self.doc.size(), parsed.segments().to_vec())?;
        tr.set_selection(Selection::cursor(tr.doc().size()));
        self.commit(tr, old);
        self.history.clear();
        Ok(())
    }

    /// Full validation pass without a document change
    pub fn revalidate(&mut self) {
        let mut tr = Transaction::new(&self.doc).without_history();
        tr.meta.force_check = true;
        let old = self.focused_id();
        self.commit(tr, old);
    }

    fn focused_id(&self) -> Option<String> {
        self.focus.focused_id().map(str::to_string)
    }

    /// Repair, record, apply and validate one transaction
    fn commit(&mut self, mut tr: Transaction, old_focused_id: Option<String>) {
        trace!(input = ?tr.meta.input, steps = tr.steps().len(), "Committing transaction");
        if tr.meta.composing {
            self.selection = tr.resolve_selection(self.selection);
            self.doc = tr.into_doc();
            self.focus.reconcile(&self.doc);
            return;
        }

        self.focus.reconcile(tr.doc());
        let mut ctx = RepairContext::for_transaction(&tr).with_focus(old_focused_id.clone(), self.focused_id());
        self.repair.run(&mut tr, &mut ctx);
        if let Some(id) = ctx.focus_request.take() {
            let cursor = value_len(tr.doc(), &id);
            self.focus.focus(id, cursor, EntryDirection::Right, FocusPolicy::Entry);
        }
        self.focus.reconcile(tr.doc());

        let selection_before = self.selection;
        let selection = snap_selection(tr.doc(), tr.resolve_selection(self.selection));
        if tr.meta.add_to_history && tr.meta.history.is_none() && tr.doc_changed() {
            self.history.record(
                HistoryEntry::new(tr.before().clone(), tr.doc().clone(), selection_before, selection)
                    .with_description(tr.meta.description.clone()),
            );
        }

        let previous = std::mem::replace(&mut self.doc, tr.doc().clone());
        self.selection = selection;

        let focused_id = self.focused_id();
        let blurred_id = old_focused_id.filter(|old| Some(old) != focused_id.as_ref());
        let input = ValidationInput {
            before: tr.before(),
            doc: tr.doc(),
            input: tr.meta.input,
            doc_changed: tr.doc_changed(),
            history: tr.meta.history,
            focused_id: focused_id.as_deref(),
            blurred_id: blurred_id.as_deref(),
            force_check: tr.meta.force_check,
        };
        match self.validator.run(&input, &self.fields) {
            Ok(outcome) => self.apply_validation(outcome),
            Err(error) => warn!(%error, "Validation pass failed"),
        }

        self.emit_changes(&previous);
    }

    fn apply_validation(&mut self, outcome: ValidationOutcome) {
        self.violations = outcome.violations;

        for vtr in outcome.transactions {
            if vtr.before() != &self.doc {
                debug!("Validation transaction does not match the document, dropping the rest");
                break;
            }
            let selection_before = self.selection;
            let selection = vtr.resolve_selection(self.selection);
            if vtr.meta.add_to_history && vtr.doc_changed() {
                self.history.record(
                    HistoryEntry::new(vtr.before().clone(), vtr.doc().clone(), selection_before, selection)
                        .with_description(vtr.meta.description.clone()),
                );
            }
            self.selection = selection;
            self.doc = vtr.into_doc();
        }

        if !outcome.deleted_token_ids.is_empty() {
            debug!(deleted = outcome.deleted_token_ids.len(), "Repairing after validation deletions");
            let mut tr = Transaction::new(&self.doc).with_input(InputKind::Repair).without_history();
            let mut ctx = RepairContext {
                doc_changed: true,
                ..RepairContext::default()
            };
            self.repair.run(&mut tr, &mut ctx);
            self.selection = snap_selection(tr.doc(), tr.resolve_selection(self.selection));
            self.doc = tr.into_doc();
        }
        self.focus.reconcile(&self.doc);
    }

    fn emit_changes(&mut self, previous: &Document) {
        if &self.doc != previous {
            self.events.push(EditorEvent::Change(self.snapshot()));
        }
        let tokens = committed_tokens(&self.doc, self.focus.focused_id(), &self.last_token_set);
        if tokens != self.last_token_set {
            self.last_token_set = tokens.clone();
            self.events.push(EditorEvent::TokenSetChanged(tokens));
        }
    }

    /// Typed text: one character is typing, anything longer a paste
    pub fn insert_text(&mut self, text: &str) -> EditorResult<()> {
        let input = if text.chars().count() == 1 {
            InputKind::Typing
        } else {
            InputKind::Paste
        };
        self.input_text(text, input)
    }

    pub fn paste(&mut self, text: &str) -> EditorResult<()> {
        self.input_text(text, InputKind::Paste)
    }

    fn input_text(&mut self, text: &str, input: InputKind) -> EditorResult<()> {
        if text.is_empty() {
            return Ok(());
        }
        if self.focus.is_focused() {
            return self.type_into_token(text, input);
        }

        let mut chars = text.chars();
        if let (Some(typed), None, false) = (chars.next(), chars.next(), self.is_composing()) {
            if self.selection.is_empty() {
                if let Some(trigger) =
                    detect_colon_trigger(&self.doc, self.selection.head, typed, self.delimiter, &self.fields)
                {
                    debug!(key = %trigger.key, "Field key typed, creating token");
                    let operator = self
                        .fields
                        .get(&trigger.key)
                        .map(|field| field.default_operator().to_string())
                        .unwrap_or_default();
                    self.selection = Selection::new(trigger.from, trigger.to);
                    self.insert_token(&trigger.key, &operator, "")?;
                    return Ok(());
                }
            }
        }

        let mut tr = self.transaction().with_input(input);
        let outcome = tr.replace(self.selection.from(), self.selection.to(), vec![Segment::text(text)])?;
        tr.set_selection(Selection::cursor(outcome.from + outcome.inserted));
        self.after_text_input(tr)
    }

    /// Tokenize what the input completed, then commit
    fn after_text_input(&mut self, mut tr: Transaction) -> EditorResult<()> {
        if !tr.meta.composing {
            let bulk = tr.meta.input != InputKind::Typing;
            if bulk || !self.tokenizer.debounces_typing() {
                self.tokenizer.cancel();
                let cursor = tr.resolve_selection(self.selection).head;
                let tokenized = self
                    .tokenizer
                    .tokenize(&mut tr, &self.fields, &mut self.ids, Some(cursor), bulk)?;
                if tokenized && tr.meta.input == InputKind::Typing {
                    tr.meta.input = InputKind::Programmatic;
                }
            } else {
                self.tokenizer.schedule(Instant::now());
            }
            let cursor = tr.resolve_selection(self.selection).head;
            self.tokenizer.strip_free_text(&mut tr, Some(cursor), false)?;
        }
        let old = self.focused_id();
        self.commit(tr, old);
        Ok(())
    }

    fn type_into_token(&mut self, text: &str, input: InputKind) -> EditorResult<()> {
        let focus = self.focus.focused().ok_or(EditorError::NoFocusedToken)?;
        let mut value: Vec<char> = self
            .doc
            .token(&focus.token_id)
            .and_then(Segment::token_value)
            .ok_or(EditorError::NoFocusedToken)?
            .chars()
            .collect();
        let at = focus.cursor.min(value.len());
        value.splice(at..at, text.chars());
        self.set_focused_value(value.into_iter().collect(), at + text.chars().count(), input)
    }

    fn set_focused_value(&mut self, value: String, cursor: usize, input: InputKind) -> EditorResult<()> {
        let id = self.focused_id().ok_or(EditorError::NoFocusedToken)?;
        let mut tr = self.transaction().with_input(input);
        tr.update_token(&id, |seg| seg.set_token_value(value))?;
        if let Some(focus) = self.focus.focused_mut() {
            focus.cursor = cursor;
        }
        self.commit(tr, Some(id));
        Ok(())
    }

    /// Replace the focused token's value as reported by its value editor
    pub fn edit_token_value(&mut self, value: &str) -> EditorResult<()> {
        self.set_focused_value(value.to_string(), value.chars().count(), InputKind::Typing)
    }

    /// Confirm a value picked from the suggestion list. Focus stays on the
    /// token unless a reject rule deletes it.
    pub fn select_suggestion(&mut self, value: &str) -> EditorResult<()> {
        if !self.focus.is_focused() {
            return Err(EditorError::NoFocusedToken);
        }
        self.focus.set_suggestion_open(false);
        self.set_focused_value(value.to_string(), value.chars().count(), InputKind::SuggestionSelect)
    }

    pub fn open_suggestions(&mut self) -> EditorResult<()> {
        if !self.focus.is_focused() {
            return Err(EditorError::NoFocusedToken);
        }
        self.focus.set_suggestion_open(true);
        Ok(())
    }

    pub fn delete_range(&mut self, from: usize, to: usize) -> EditorResult<()> {
        self.delete_with(from, to, InputKind::Programmatic)
    }

    fn delete_with(&mut self, from: usize, to: usize, input: InputKind) -> EditorResult<()> {
        let mut tr = self.transaction().with_input(input);
        let outcome = tr.delete(from, to)?;
        tr.set_selection(Selection::cursor(outcome.from));
        let old = self.focused_id();
        self.commit(tr, old);
        Ok(())
    }

    /// Insert a filter token over the selection. An empty value on a
    /// mutable field focuses the new token for editing.
    pub fn insert_token(&mut self, key: &str, operator: &str, value: &str) -> EditorResult<String> {
        let id = self.ids.new_id();
        let immutable = self.fields.is_immutable(key);
        let token: Segment = FilterToken::new(id.as_str(), key, operator, value)
            .immutable(immutable)
            .into();

        let old = self.focused_id();
        let mut tr = self.transaction();
        let outcome = tr.replace(self.selection.from(), self.selection.to(), vec![token])?;
        tr.set_selection(Selection::cursor(outcome.from + outcome.inserted));

        if value.is_empty() && !immutable {
            self.focus.focus(id.as_str(), 0, EntryDirection::Left, FocusPolicy::Entry);
        } else {
            self.focus.blur();
        }
        self.commit(tr, old);
        Ok(id)
    }

    pub fn handle_key(&mut self, event: impl Into<KeyEvent>) -> EditorResult<()> {
        let event = event.into();
        if self.is_composing() {
            trace!(key = ?event.key, "Ignoring key during composition");
            return Ok(());
        }
        if self.focus.is_focused() {
            return self.handle_token_key(event);
        }

        match event.key {
            Key::ArrowLeft | Key::ArrowRight => self.move_cursor(event),
            Key::Backspace | Key::Delete => self.delete_key(event.key),
            Key::Escape => Ok(()),
            Key::Enter => self.submit(),
            Key::Tab => self.flush_tokenize(true, false, true),
            Key::Char(c) => {
                let mut buf = [0; 4];
                self.insert_text(c.encode_utf8(&mut buf))
            }
        }
    }

    fn move_cursor(&mut self, event: KeyEvent) -> EditorResult<()> {
        let direction = event.direction();
        if event.shift {
            self.selection = extend_selection(&self.doc, self.selection, direction);
            return Ok(());
        }
        if !self.selection.is_empty() {
            let pos = if direction > 0 {
                self.selection.to()
            } else {
                self.selection.from()
            };
            self.selection = Selection::cursor(pos);
            return Ok(());
        }

        let cursor = self.selection.head;
        match enforce_selection_invariant(&self.doc, cursor, direction) {
            Some(action) => self.apply_guard_action(action),
            None => {
                self.selection = Selection::cursor(next_stop(&self.doc, cursor, direction));
                Ok(())
            }
        }
    }

    fn delete_key(&mut self, key: Key) -> EditorResult<()> {
        if !self.selection.is_empty() {
            return self.delete_with(self.selection.from(), self.selection.to(), InputKind::Typing);
        }
        let cursor = self.selection.head;
        if let Some(action) = boundary_delete(&self.doc, cursor, key) {
            return self.apply_guard_action(action);
        }
        match key {
            Key::Backspace if cursor > 0 => self.delete_with(cursor - 1, cursor, InputKind::Typing),
            Key::Delete if cursor < self.doc.size() => self.delete_with(cursor, cursor + 1, InputKind::Typing),
            _ => Ok(()),
        }
    }

    /// Keys while a token's value editor has focus
    fn handle_token_key(&mut self, event: KeyEvent) -> EditorResult<()> {
        let Some(focus) = self.focus.focused().cloned() else {
            return Ok(());
        };
        let mut value: Vec<char> = self
            .doc
            .token(&focus.token_id)
            .and_then(Segment::token_value)
            .map(|value| value.chars().collect())
            .unwrap_or_default();
        let cursor = focus.cursor.min(value.len());

        match event.key {
            Key::ArrowLeft if cursor == 0 => self.leave_token(EntryDirection::Left),
            Key::ArrowRight if cursor >= value.len() => self.leave_token(EntryDirection::Right),
            Key::ArrowLeft | Key::ArrowRight => {
                if let Some(focus) = self.focus.focused_mut() {
                    focus.cursor = if event.direction() < 0 { cursor - 1 } else { cursor + 1 };
                }
                Ok(())
            }
            Key::Backspace if value.is_empty() => self.leave_token(EntryDirection::Left),
            Key::Backspace if cursor == 0 => Ok(()),
            Key::Backspace => {
                value.remove(cursor - 1);
                self.set_focused_value(value.into_iter().collect(), cursor - 1, InputKind::Typing)
            }
            Key::Delete if cursor >= value.len() => Ok(()),
            Key::Delete => {
                value.remove(cursor);
                self.set_focused_value(value.into_iter().collect(), cursor, InputKind::Typing)
            }
            Key::Escape => self.escape(),
            Key::Enter | Key::Tab => self.leave_token(EntryDirection::Right),
            Key::Char(c) => {
                let mut buf = [0; 4];
                self.type_into_token(c.encode_utf8(&mut buf), InputKind::Typing)
            }
        }
    }

    /// First Escape closes the suggestion list, the second leaves the token
    fn escape(&mut self) -> EditorResult<()> {
        let location = self.focus.location(&self.doc);
        if let EscapeOutcome::Exited(id) = self.focus.escape() {
            if let Some(location) = location {
                self.selection = Selection::cursor(location.end());
            }
            let tr = Transaction::new(&self.doc);
            self.commit(tr, Some(id));
        }
        Ok(())
    }

    /// Drop focus and put the cursor at one of the token's boundaries
    fn leave_token(&mut self, side: EntryDirection) -> EditorResult<()> {
        if let Some(location) = self.focus.location(&self.doc) {
            let pos = match side {
                EntryDirection::Left => location.pos,
                EntryDirection::Right => location.end(),
            };
            self.selection = Selection::cursor(pos);
        }
        self.blur_token();
        Ok(())
    }

    /// Leave the focused token, running blur cleanup and validation
    pub fn blur_token(&mut self) {
        if let Some(old) = self.focus.blur() {
            let tr = Transaction::new(&self.doc);
            self.commit(tr, Some(old));
        }
    }

    pub fn apply_guard_action(&mut self, action: GuardAction) -> EditorResult<()> {
        match action {
            GuardAction::Move(pos) => {
                self.selection = Selection::cursor(pos.min(self.doc.size()));
                Ok(())
            }
            GuardAction::Select(selection) => {
                self.selection = selection.clamp(self.doc.size());
                Ok(())
            }
            GuardAction::Focus {
                token_id,
                cursor,
                direction,
                policy,
            } => self.enter_token(&token_id, cursor, direction, policy),
        }
    }

    /// Focus a token's value editor. Immutable tokens are selected whole.
    fn enter_token(
        &mut self,
        id: &str,
        cursor: usize,
        direction: EntryDirection,
        policy: FocusPolicy,
    ) -> EditorResult<()> {
        let location = self
            .doc
            .find_token(id)
            .ok_or_else(|| DocumentError::TokenNotFound(id.to_string()))?;
        if self.doc.get(location.index).is_some_and(Segment::is_immutable) {
            self.selection = Selection::new(location.pos, location.end());
            return Ok(());
        }

        debug!(token_id = %id, ?direction, ?policy, "Entering token");
        let old = self.focused_id();
        self.focus.focus(id, cursor, direction, policy);
        self.focus.reconcile(&self.doc);
        self.selection = Selection::cursor(location.pos);
        if old.as_deref() != Some(id) {
            let tr = Transaction::new(&self.doc);
            self.commit(tr, old);
        }
        Ok(())
    }

    /// Focus a token by id with the cursor at the end of its value
    pub fn focus_token(&mut self, id: &str) -> EditorResult<()> {
        let cursor = value_len(&self.doc, id);
        self.enter_token(id, cursor, EntryDirection::Right, FocusPolicy::All)
    }

    pub fn click(&mut self, pos: usize) -> EditorResult<()> {
        let pos = pos.min(self.doc.size());
        if let Some(inside) = get_cursor_inside_token(&self.doc, pos) {
            if inside.immutable {
                if let Some(action) = resolve_cursor_inside_token(&self.doc, pos) {
                    self.blur_token();
                    return self.apply_guard_action(action);
                }
            }
            let cursor = (pos - inside.from - 1).min(value_len(&self.doc, &inside.token_id));
            return self.enter_token(&inside.token_id, cursor, EntryDirection::Left, FocusPolicy::All);
        }
        self.selection = Selection::cursor(pos);
        self.blur_token();
        Ok(())
    }

    /// Selection reported by the host. While dragging it is stored as is.
    pub fn set_selection(&mut self, selection: Selection) -> EditorResult<()> {
        let selection = selection.clamp(self.doc.size());
        if self.dragging {
            self.selection = selection;
            return Ok(());
        }

        let previous = self.selection;
        self.blur_token();
        if let Some(action) = collapse_range(&self.doc, previous, selection) {
            return self.apply_guard_action(action);
        }
        if selection.is_empty() {
            if let Some(action) = resolve_cursor_inside_token(&self.doc, selection.head) {
                return self.apply_guard_action(action);
            }
        }
        self.selection = snap_selection(&self.doc, selection);
        Ok(())
    }

    pub fn begin_drag(&mut self) {
        self.dragging = true;
    }

    /// The gesture is over; the selection it left behind is checked now
    pub fn end_drag(&mut self) -> EditorResult<()> {
        self.dragging = false;
        let selection = self.selection;
        if selection.is_empty() {
            if let Some(action) = resolve_cursor_inside_token(&self.doc, selection.head) {
                return self.apply_guard_action(action);
            }
        }
        self.selection = snap_selection(&self.doc, selection);
        Ok(())
    }

    pub fn focus_editor(&mut self) {
        if !self.editor_focused {
            self.editor_focused = true;
            self.events.push(EditorEvent::Focus);
        }
    }

    /// Leaving the editor commits pending free text like a submit does
    pub fn blur_editor(&mut self) -> EditorResult<()> {
        self.blur_token();
        self.flush_tokenize(true, true, true)?;
        if self.editor_focused {
            self.editor_focused = false;
            self.events.push(EditorEvent::Blur);
        }
        Ok(())
    }

    pub fn submit(&mut self) -> EditorResult<()> {
        self.blur_token();
        self.flush_tokenize(true, true, true)?;
        self.events.push(EditorEvent::Submit(self.snapshot()));
        Ok(())
    }

    /// Run a debounced tokenize that has come due
    pub fn tick(&mut self, now: Instant) -> EditorResult<()> {
        if self.is_composing() || !self.tokenizer.take_due(now) {
            return Ok(());
        }
        self.flush_tokenize(false, false, false)
    }

    fn flush_tokenize(&mut self, force: bool, strip_all: bool, add_to_history: bool) -> EditorResult<()> {
        self.tokenizer.cancel();
        let mut tr = Transaction::new(&self.doc).with_input(InputKind::Programmatic);
        tr.meta.add_to_history = add_to_history;

        let cursor = Some(self.selection.head);
        self.tokenizer.tokenize(&mut tr, &self.fields, &mut self.ids, cursor, force)?;
        let cursor = Some(tr.resolve_selection(self.selection).head);
        self.tokenizer.strip_free_text(&mut tr, cursor, strip_all)?;

        if tr.doc_changed() {
            let old = self.focused_id();
            self.commit(tr, old);
        }
        Ok(())
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Group every recorded change until `end_batch` into one undo step
    pub fn begin_batch(&mut self, description: Option<&str>) {
        self.history.begin_batch();
        if let Some(description) = description {
            self.history.set_batch_description(description);
        }
    }

    pub fn end_batch(&mut self) {
        self.history.end_batch();
    }

    /// Run `f` as a single undo step
    pub fn batch<T>(&mut self, description: &str, f: impl FnOnce(&mut Self) -> EditorResult<T>) -> EditorResult<T> {
        self.begin_batch(Some(description));
        let result = f(self);
        self.end_batch();
        result
    }

    pub fn undo(&mut self) -> EditorResult<bool> {
        let Some(entry) = self.history.undo().cloned() else {
            return Ok(false);
        };
        self.restore(&entry.before, entry.selection_before, HistoryOp::Undo)?;
        Ok(true)
    }

    pub fn redo(&mut self) -> EditorResult<bool> {
        let Some(entry) = self.history.redo().cloned() else {
            return Ok(false);
        };
        self.restore(&entry.after, entry.selection_after, HistoryOp::Redo)?;
        Ok(true)
    }

    fn restore(&mut self, doc: &Document, selection: Selection, op: HistoryOp) -> EditorResult<()> {
        debug!(?op, "Restoring history entry");
        let old = self.focus.blur();
        self.tokenizer.cancel();
        let mut tr = Transaction::new(&self.doc).without_history();
        tr.meta.history = Some(op);
        tr.replace(0, self.doc.size(), doc.segments().to_vec())?;
        tr.set_selection(selection);
        self.commit(tr, old);
        Ok(())
    }

    /// Repair and validation wait until the composition ends
    pub fn composition_start(&mut self) {
        if self.composition_base.is_none() {
            self.composition_base = Some(self.doc.clone());
            self.tokenizer.cancel();
        }
    }

    /// Commit everything composed as one typing transaction
    pub fn composition_end(&mut self) -> EditorResult<()> {
        let Some(base) = self.composition_base.take() else {
            return Ok(());
        };
        let composed = std::mem::replace(&mut self.doc, base);
        let selection = self.selection;

        let mut tr = Transaction::new(&self.doc).with_input(InputKind::Typing);
        tr.replace(0, self.doc.size(), composed.segments().to_vec())?;
        tr.set_selection(selection);
        self.after_text_input(tr)
    }
}

impl std::fmt::Debug for QueryEditor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryEditor")
            .field("doc", &self.doc.debug_string())
            .field("selection", &self.selection)
            .field("focus", &self.focus)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use querybar_document::FieldDefinition;

    fn editor() -> QueryEditor {
        let config = EditorConfig::default().with_fields(vec![FieldDefinition::new("status")]);
        QueryEditor::new(config).unwrap()
    }

    #[test]
    fn test_invalid_delimiter_fails_construction() {
        let config = EditorConfig::default().with_delimiter("ab");
        assert!(matches!(
            QueryEditor::new(config),
            Err(EditorError::InvalidDelimiter(_))
        ));
    }

    #[test]
    fn test_snap_selection_out_of_token() {
        let doc = Document::from_segments(vec![
            Segment::Spacer,
            FilterToken::new("t", "k", "is", "abcd").into(),
            Segment::Spacer,
        ]);
        // token spans 1..7
        assert_eq!(snap_selection(&doc, Selection::cursor(2)), Selection::cursor(1));
        assert_eq!(snap_selection(&doc, Selection::cursor(6)), Selection::cursor(7));
        assert_eq!(snap_selection(&doc, Selection::cursor(20)), Selection::cursor(8));
    }

    #[test]
    fn test_stale_dispatch_is_rejected() {
        let mut editor = editor();
        let tr = editor.transaction();
        editor.insert_text("a").unwrap();
        assert!(matches!(editor.dispatch(tr), Err(EditorError::StaleTransaction)));
    }

    #[test]
    fn test_type_into_focused_token() {
        let mut editor = editor();
        let id = editor.insert_token("status", "is", "").unwrap();
        assert_eq!(editor.focus().focused_id(), Some(id.as_str()));

        editor.handle_key(Key::Char('o')).unwrap();
        editor.handle_key(Key::Char('k')).unwrap();
        editor.handle_key(Key::ArrowLeft).unwrap();
        editor.handle_key(Key::Char('x')).unwrap();

        assert_eq!(editor.doc().token(&id).and_then(Segment::token_value), Some("oxk"));
        assert_eq!(editor.focus().focused().unwrap().cursor, 2);
    }

    #[test]
    fn test_select_suggestion_requires_focus() {
        let mut editor = editor();
        assert!(matches!(
            editor.select_suggestion("open"),
            Err(EditorError::NoFocusedToken)
        ));
    }
}
