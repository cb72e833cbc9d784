//! # Repair Pipeline
//!
//! Every document-changing transaction is followed by an ordered set of
//! repair phases that restore the spacer invariant before the result
//! becomes visible.
//!
//! ## Phases
//!
//! 1. History empty-token focus: undo/redo brought back an empty token, so
//!    focus it instead of letting cleanup drop it again
//! 2. Empty-token cleanup: the token that just lost focus is still empty
//! 3. Orphaned-spacer cleanup: spacers touching no token, and duplicate
//!    spacers in a run
//! 4. Missing-spacer repair: every token gets a spacer on both sides
//! 5. Adjacent-text repair: text runs left touching are joined, with a
//!    single space at the seam
//!
//! Phases append steps to the transaction they are given and communicate
//! only through [`RepairContext`]. The pipeline is idempotent: running it on
//! a repaired document changes nothing.

use querybar_document::{
    apply_spacer_deletion, apply_spacer_deletions, check_boundary_needs_space, expand_with_spacers, Document,
    DocumentResult, InputKind, Segment, SpacerRange, TokenLocation, Transaction,
};
use tracing::{debug, trace};

/// State threaded through one pipeline run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairContext {
    /// Cumulative: set by the transaction and by every phase that modified it
    pub doc_changed: bool,
    pub focus_changed: bool,
    pub old_focused_id: Option<String>,
    pub focused_id: Option<String>,
    pub is_history_operation: bool,
    /// Token the pipeline wants focused once the transaction is applied
    pub focus_request: Option<String>,
}

impl RepairContext {
    pub fn for_transaction(tr: &Transaction) -> Self {
        Self {
            doc_changed: tr.doc_changed(),
            is_history_operation: tr.meta.history.is_some(),
            ..Self::default()
        }
    }

    pub fn with_focus(mut self, old_focused_id: Option<String>, focused_id: Option<String>) -> Self {
        self.focus_changed = old_focused_id != focused_id;
        self.old_focused_id = old_focused_id;
        self.focused_id = focused_id;
        self
    }
}

pub trait RepairPhase: std::fmt::Debug {
    fn name(&self) -> &'static str;

    fn should_run(&self, ctx: &RepairContext) -> bool;

    /// Returns whether the transaction was modified
    fn execute(&self, tr: &mut Transaction, ctx: &mut RepairContext) -> DocumentResult<bool>;
}

fn is_empty_token(seg: &Segment) -> bool {
    seg.token_value().is_some_and(str::is_empty)
}

#[derive(Debug)]
pub struct HistoryEmptyTokenFocus;

impl RepairPhase for HistoryEmptyTokenFocus {
    fn name(&self) -> &'static str {
        "history-empty-token-focus"
    }

    fn should_run(&self, ctx: &RepairContext) -> bool {
        ctx.is_history_operation && ctx.doc_changed
    }

    fn execute(&self, tr: &mut Transaction, ctx: &mut RepairContext) -> DocumentResult<bool> {
        let restored = tr
            .doc()
            .tokens()
            .filter(|(_, seg)| is_empty_token(seg))
            .filter_map(|(_, seg)| seg.token_id())
            .find(|id| tr.before().find_token(id).is_none())
            .map(str::to_string);

        if let Some(id) = restored {
            debug!(token_id = %id, "Focusing empty token restored by history");
            ctx.focused_id = Some(id.clone());
            ctx.focus_request = Some(id);
        }
        Ok(false)
    }
}

#[derive(Debug)]
pub struct EmptyTokenCleanup;

impl RepairPhase for EmptyTokenCleanup {
    fn name(&self) -> &'static str {
        "empty-token-cleanup"
    }

    fn should_run(&self, ctx: &RepairContext) -> bool {
        ctx.focus_changed && ctx.old_focused_id.is_some()
    }

    fn execute(&self, tr: &mut Transaction, ctx: &mut RepairContext) -> DocumentResult<bool> {
        let Some(old) = ctx.old_focused_id.as_deref() else {
            return Ok(false);
        };
        if ctx.focused_id.as_deref() == Some(old) {
            return Ok(false);
        }
        let Some(location) = tr.doc().find_token(old) else {
            return Ok(false);
        };
        if !tr.doc().get(location.index).is_some_and(is_empty_token) {
            return Ok(false);
        }

        debug!(token_id = %old, "Removing empty token after blur");
        let range = expand_with_spacers(tr.doc(), location.pos, location.size);
        apply_spacer_deletions(tr, vec![range])
    }
}

/// Maximal runs of consecutive spacers as `(from, to)` positions
fn spacer_runs(doc: &Document) -> Vec<(usize, usize)> {
    let mut runs: Vec<(usize, usize)> = Vec::new();
    for (pos, seg) in doc.positioned() {
        if !seg.is_spacer() {
            continue;
        }
        match runs.last_mut() {
            Some(run) if run.1 == pos => run.1 = pos + 1,
            _ => runs.push((pos, pos + 1)),
        }
    }
    runs
}

#[derive(Debug)]
pub struct OrphanedSpacerCleanup;

impl RepairPhase for OrphanedSpacerCleanup {
    fn name(&self) -> &'static str {
        "orphaned-spacer-cleanup"
    }

    fn should_run(&self, ctx: &RepairContext) -> bool {
        ctx.doc_changed
    }

    fn execute(&self, tr: &mut Transaction, _ctx: &mut RepairContext) -> DocumentResult<bool> {
        let doc = tr.doc();
        let mut ranges = Vec::new();

        for (from, to) in spacer_runs(doc) {
            let touches_token = doc.node_before(from).is_some_and(|(_, seg)| seg.is_token())
                || doc.node_after(to).is_some_and(|(_, seg)| seg.is_token());

            if touches_token {
                // one spacer serves both neighbours
                if to - from > 1 {
                    ranges.push(SpacerRange {
                        from: from + 1,
                        to,
                        needs_space_separator: false,
                    });
                }
            } else {
                ranges.push(SpacerRange {
                    from,
                    to,
                    needs_space_separator: check_boundary_needs_space(doc, from, to),
                });
            }
        }

        let mut modified = false;
        for range in ranges.iter().rev() {
            modified |= apply_spacer_deletion(tr, range)?;
        }
        Ok(modified)
    }
}

#[derive(Debug)]
pub struct MissingSpacer;

impl RepairPhase for MissingSpacer {
    fn name(&self) -> &'static str {
        "missing-spacer"
    }

    fn should_run(&self, ctx: &RepairContext) -> bool {
        ctx.doc_changed
    }

    fn execute(&self, tr: &mut Transaction, _ctx: &mut RepairContext) -> DocumentResult<bool> {
        let locations: Vec<TokenLocation> = tr.doc().tokens().map(|(location, _)| location).collect();
        let mut modified = false;

        for location in locations.into_iter().rev() {
            if !tr.doc().node_after(location.end()).is_some_and(|(_, seg)| seg.is_spacer()) {
                tr.insert(location.end(), vec![Segment::Spacer])?;
                modified = true;
            }
            if !tr.doc().node_before(location.pos).is_some_and(|(_, seg)| seg.is_spacer()) {
                tr.insert(location.pos, vec![Segment::Spacer])?;
                modified = true;
            }
        }
        Ok(modified)
    }
}

/// Join text pieces, leaving a single space at each seam
fn join_text(pieces: &[&str]) -> String {
    let mut joined = String::new();
    for piece in pieces {
        let left = joined.chars().last().map(char::is_whitespace);
        let right = piece.chars().next();
        match (left, right) {
            (Some(true), Some(first)) if first.is_whitespace() => {
                joined.truncate(joined.trim_end().len());
                joined.push(' ');
                joined.push_str(piece.trim_start());
            }
            (Some(false), Some(first)) if !first.is_whitespace() => {
                joined.push(' ');
                joined.push_str(piece);
            }
            _ => joined.push_str(piece),
        }
    }
    joined
}

#[derive(Debug)]
pub struct AdjacentText;

impl RepairPhase for AdjacentText {
    fn name(&self) -> &'static str {
        "adjacent-text"
    }

    fn should_run(&self, ctx: &RepairContext) -> bool {
        ctx.doc_changed
    }

    fn execute(&self, tr: &mut Transaction, _ctx: &mut RepairContext) -> DocumentResult<bool> {
        let mut runs: Vec<(usize, usize, Vec<&str>)> = Vec::new();
        let mut previous_was_text = false;
        for (pos, seg) in tr.doc().positioned() {
            match seg.as_text() {
                Some(text) => {
                    match runs.last_mut() {
                        Some(run) if previous_was_text => {
                            run.1 = pos + seg.size();
                            run.2.push(text);
                        }
                        _ => runs.push((pos, pos + seg.size(), vec![text])),
                    }
                    previous_was_text = true;
                }
                None => previous_was_text = false,
            }
        }

        let joins: Vec<(usize, usize, String)> = runs
            .into_iter()
            .filter(|(_, _, pieces)| pieces.len() > 1)
            .map(|(from, to, pieces)| (from, to, join_text(&pieces)))
            .collect();

        for (from, to, text) in joins.iter().rev() {
            tr.replace(*from, *to, vec![Segment::text(text.as_str())])?;
        }
        Ok(!joins.is_empty())
    }
}

#[derive(Debug)]
pub struct RepairPipeline {
    phases: Vec<Box<dyn RepairPhase>>,
}

impl RepairPipeline {
    pub fn new() -> Self {
        Self {
            phases: vec![
                Box::new(HistoryEmptyTokenFocus),
                Box::new(EmptyTokenCleanup),
                Box::new(OrphanedSpacerCleanup),
                Box::new(MissingSpacer),
                Box::new(AdjacentText),
            ],
        }
    }

    pub fn phase_names(&self) -> Vec<&'static str> {
        self.phases.iter().map(|phase| phase.name()).collect()
    }

    /// Run every phase in order, appending repair steps to `tr`.
    /// Returns whether any phase modified the transaction.
    pub fn run(&self, tr: &mut Transaction, ctx: &mut RepairContext) -> bool {
        if tr.meta.composing {
            trace!("Skipping repair during composition");
            return false;
        }

        let mut modified = false;
        for phase in &self.phases {
            if !phase.should_run(ctx) {
                continue;
            }
            match phase.execute(tr, ctx) {
                Ok(true) => {
                    debug!(phase = phase.name(), "Repair phase modified document");
                    ctx.doc_changed = true;
                    modified = true;
                }
                Ok(false) => {}
                Err(error) => debug!(phase = phase.name(), %error, "Repair phase skipped"),
            }
        }
        modified
    }
}

impl Default for RepairPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Repair a document outside of any edit, e.g. after loading a value
pub fn repair_document(doc: &Document) -> Document {
    let mut tr = Transaction::new(doc).with_input(InputKind::Repair);
    let mut ctx = RepairContext {
        doc_changed: true,
        ..RepairContext::default()
    };
    RepairPipeline::new().run(&mut tr, &mut ctx);
    tr.into_doc()
}
