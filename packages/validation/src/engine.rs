//! # Validation Engine
//!
//! One pass runs Snapshot → Plan → Apply against a transaction that has
//! already been repaired.
//!
//! ```text
//!   before ─┐
//!           ├─► collect + diff ─► rules (by priority) ─► overrides ─► plan
//!   doc ────┘                                                          │
//!            ┌─────────────────────────────────────────────────────────┘
//!            ▼
//!   housekeeping tr (no history) ─► rule deletion tr (history) ─► re-validate
//!            ─► mark/clear tr (no history)
//! ```

use crate::context::{collect_tokens, diff_tokens, RuleContext, TokenDiff};
use crate::planner::{apply_field_overrides, build_mark_plan, build_plan, DeletionTiming, PlannedDeletion, ValidationPlan};
use crate::rules::RuleRegistry;
use crate::violation::Violation;
use querybar_document::{
    apply_spacer_deletions, expand_with_spacers, Document, DocumentResult, FieldRegistry, HistoryOp,
    InputKind, Transaction,
};
use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// What happened in the transaction being validated
#[derive(Debug, Clone, Copy)]
pub struct ValidationInput<'a> {
    pub before: &'a Document,
    pub doc: &'a Document,
    pub input: InputKind,
    pub doc_changed: bool,
    pub history: Option<HistoryOp>,
    pub focused_id: Option<&'a str>,
    /// Token that lost focus in this transaction
    pub blurred_id: Option<&'a str>,
    pub force_check: bool,
}

impl<'a> ValidationInput<'a> {
    /// Input for a plain document change with no focus involved
    pub fn changed(before: &'a Document, doc: &'a Document) -> Self {
        Self {
            before,
            doc,
            input: InputKind::Programmatic,
            doc_changed: before != doc,
            history: None,
            focused_id: None,
            blurred_id: None,
            force_check: false,
        }
    }

    /// Forced check of a document, e.g. right after load
    pub fn forced(doc: &'a Document) -> Self {
        Self {
            force_check: true,
            ..Self::changed(doc, doc)
        }
    }

    pub fn is_relevant(&self) -> bool {
        self.doc_changed || self.blurred_id.is_some() || self.force_check
    }

    pub fn is_history_operation(&self) -> bool {
        self.history.is_some()
    }
}

#[derive(Debug, Default)]
pub struct ValidationOutcome {
    /// Follow-up transactions, in the order they must be applied
    pub transactions: Vec<Transaction>,
    /// Violations of the final document state
    pub violations: Vec<Violation>,
    pub deleted_token_ids: Vec<String>,
}

impl ValidationOutcome {
    /// Document after all follow-up transactions
    pub fn doc(&self) -> Option<&Document> {
        self.transactions.last().map(Transaction::doc)
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct ValidationEngine {
    rules: RuleRegistry,
}

impl ValidationEngine {
    pub fn new(rules: RuleRegistry) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &RuleRegistry {
        &self.rules
    }

    /// Run every rule; a failing or panicking rule is logged and skipped
    pub fn evaluate(&self, ctx: &RuleContext<'_>) -> Vec<Violation> {
        let mut violations = Vec::new();
        for rule in self.rules.by_priority() {
            match panic::catch_unwind(AssertUnwindSafe(|| rule.validate(ctx))) {
                Ok(Ok(found)) => violations.extend(found),
                Ok(Err(err)) => {
                    warn!(rule_id = %rule.id(), error = %err, "Validation rule failed, skipping");
                }
                Err(_) => {
                    warn!(rule_id = %rule.id(), "Validation rule panicked, skipping");
                }
            }
        }
        apply_field_overrides(violations, ctx.tokens, ctx.fields)
    }

    pub fn run(&self, input: &ValidationInput<'_>, fields: &FieldRegistry) -> DocumentResult<ValidationOutcome> {
        let mut outcome = ValidationOutcome::default();
        if !input.is_relevant() {
            return Ok(outcome);
        }

        // Snapshot
        let tokens = collect_tokens(input.doc);
        let diff = if input.is_history_operation() {
            TokenDiff::default()
        } else {
            diff_tokens(&collect_tokens(input.before), &tokens)
        };
        let editing = editing_ids(&diff, input);
        let ctx = RuleContext {
            tokens: &tokens,
            new_token_ids: &diff.new_token_ids,
            modified_token_ids: &diff.modified_token_ids,
            editing_token_ids: &editing,
            fields,
            force_check: input.force_check,
        };
        let violations = self.evaluate(&ctx);

        // Plan
        let timing = DeletionTiming {
            is_history_operation: input.is_history_operation(),
            blurred: input.blurred_id.is_some(),
            confirmed_change: input.input.is_confirming() && input.doc_changed,
            force_check: input.force_check,
            creation_in_progress: tokens.iter().any(|token| token.value.is_empty()),
            focused_confirmed: input.input == InputKind::SuggestionSelect && input.doc_changed,
        };
        let plan = build_plan(input.doc, &tokens, &violations, input.focused_id, timing);
        debug!(
            violations = violations.len(),
            deletions = plan.deletions.len(),
            marks = plan.marks.len(),
            clears = plan.clears.len(),
            "Validation plan"
        );

        if plan.deletions.is_empty() {
            outcome.transactions.extend(mark_transaction(input.doc, &plan)?);
            outcome.violations = violations;
            return Ok(outcome);
        }

        // Apply
        let mut current = input.doc.clone();

        let housekeeping: Vec<&PlannedDeletion> = plan.housekeeping().collect();
        if let Some(tr) = deletion_transaction(&current, &housekeeping, false)? {
            current = tr.doc().clone();
            outcome.transactions.push(tr);
        }

        let rule_deletions: Vec<&PlannedDeletion> = plan.rule_deletions().collect();
        let record = !input.is_history_operation();
        if let Some(tr) = deletion_transaction(&current, &rule_deletions, record)? {
            current = tr.doc().clone();
            outcome.transactions.push(tr);
        }

        outcome.deleted_token_ids = plan.deletions.iter().map(|d| d.token_id.clone()).collect();

        // positions shifted and a deletion may have resolved other violations
        let tokens = collect_tokens(&current);
        let surviving: HashSet<&str> = tokens.iter().map(|t| t.id.as_str()).collect();
        let keep = |ids: &HashSet<String>| -> HashSet<String> {
            ids.iter().filter(|id| surviving.contains(id.as_str())).cloned().collect()
        };
        let new_ids = keep(&diff.new_token_ids);
        let modified_ids = keep(&diff.modified_token_ids);
        let editing = keep(&editing);
        let ctx = RuleContext {
            tokens: &tokens,
            new_token_ids: &new_ids,
            modified_token_ids: &modified_ids,
            editing_token_ids: &editing,
            fields,
            force_check: input.force_check,
        };
        let violations = self.evaluate(&ctx);
        let mark_plan = build_mark_plan(&current, &violations);
        outcome.transactions.extend(mark_transaction(&current, &mark_plan)?);
        outcome.violations = violations;

        Ok(outcome)
    }
}

fn editing_ids(diff: &TokenDiff, input: &ValidationInput<'_>) -> HashSet<String> {
    diff.new_token_ids
        .iter()
        .chain(diff.modified_token_ids.iter())
        .map(String::as_str)
        .chain(input.focused_id)
        .chain(input.blurred_id)
        .map(str::to_string)
        .collect()
}

/// Delete tokens together with their spacers in one transaction
fn deletion_transaction(
    doc: &Document,
    deletions: &[&PlannedDeletion],
    add_to_history: bool,
) -> DocumentResult<Option<Transaction>> {
    let ranges: Vec<_> = deletions
        .iter()
        .filter_map(|deletion| doc.find_token(&deletion.token_id))
        .map(|location| expand_with_spacers(doc, location.pos, location.size))
        .collect();
    if ranges.is_empty() {
        return Ok(None);
    }

    let mut tr = Transaction::new(doc).with_input(InputKind::Validation);
    tr.meta.add_to_history = add_to_history;
    tr.meta.description = Some(if add_to_history {
        "Remove invalid tokens".to_string()
    } else {
        "Remove empty tokens".to_string()
    });

    if apply_spacer_deletions(&mut tr, ranges)? {
        Ok(Some(tr))
    } else {
        Ok(None)
    }
}

/// Set or clear invalid flags; only tokens whose state changes get a step
fn mark_transaction(doc: &Document, plan: &ValidationPlan) -> DocumentResult<Option<Transaction>> {
    let mut tr = Transaction::new(doc)
        .with_input(InputKind::Validation)
        .without_history();

    for (id, reason) in &plan.marks {
        let Some(seg) = doc.token(id) else {
            continue;
        };
        if seg.invalid_reason() == Some(reason.as_str()) {
            continue;
        }
        tr.update_token(id, |seg| seg.set_invalid(Some(reason.clone())))?;
    }
    for id in &plan.clears {
        if doc.token(id).is_some_and(|seg| seg.is_invalid()) {
            tr.update_token(id, |seg| seg.set_invalid(None))?;
        }
    }

    Ok(tr.doc_changed().then_some(tr))
}
