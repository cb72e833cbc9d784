//! # Validation Plan
//!
//! Turns the violations of one pass into concrete actions.
//!
//! ```text
//! violations ──► field overrides ──► timing gate ──► plan
//!                                        │
//!                     ┌──────────────────┼───────────────────┐
//!                     ▼                  ▼                   ▼
//!               housekeeping        rule deletions      marks / clears
//!              (empty tokens)      (history entry)     (no history)
//! ```

use crate::context::TokenSnapshot;
use crate::violation::{Violation, ViolationAction};
use querybar_document::{Document, FieldRegistry};
use std::collections::{HashMap, HashSet};

/// Inputs of the "may we delete right now" decision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeletionTiming {
    pub is_history_operation: bool,
    /// Focus just left a token
    pub blurred: bool,
    /// The document changed through a non-typing path (paste, suggestion, API)
    pub confirmed_change: bool,
    pub force_check: bool,
    /// An empty token exists, i.e. the user is in the middle of creating one
    pub creation_in_progress: bool,
    /// The focused token's value was just confirmed without typing
    /// (suggestion selection), so it is not shielded by focus
    pub focused_confirmed: bool,
}

impl DeletionTiming {
    pub fn should_delete_now(&self) -> bool {
        if self.is_history_operation {
            return false;
        }
        if self.blurred || self.confirmed_change {
            return true;
        }
        self.force_check && !self.creation_in_progress
    }
}

/// A token the plan deletes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedDeletion {
    pub token_id: String,
    pub rule_id: Option<String>,
}

impl PlannedDeletion {
    /// Housekeeping deletions are not attributed to a rule
    pub fn is_housekeeping(&self) -> bool {
        self.rule_id.is_none()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationPlan {
    pub deletions: Vec<PlannedDeletion>,
    /// Token id to invalid reason
    pub marks: Vec<(String, String)>,
    pub clears: Vec<String>,
}

impl ValidationPlan {
    pub fn housekeeping(&self) -> impl Iterator<Item = &PlannedDeletion> {
        self.deletions.iter().filter(|d| d.is_housekeeping())
    }

    pub fn rule_deletions(&self) -> impl Iterator<Item = &PlannedDeletion> {
        self.deletions.iter().filter(|d| !d.is_housekeeping())
    }

    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty() && self.marks.is_empty() && self.clears.is_empty()
    }
}

/// Drop targets whose field disables the violating rule
pub fn apply_field_overrides(
    violations: Vec<Violation>,
    tokens: &[TokenSnapshot],
    fields: &FieldRegistry,
) -> Vec<Violation> {
    let keys: HashMap<&str, &str> = tokens
        .iter()
        .map(|token| (token.id.as_str(), token.key.as_str()))
        .collect();

    violations
        .into_iter()
        .filter_map(|mut violation| {
            let rule_id = violation.rule_id.clone();
            violation.targets.retain(|target| {
                keys.get(target.token_id.as_str())
                    .map_or(true, |key| fields.rule_enabled(key, &rule_id))
            });
            (!violation.targets.is_empty()).then_some(violation)
        })
        .collect()
}

/// Build the plan for one pass.
///
/// `violations` must already be filtered through the field overrides.
pub fn build_plan(
    doc: &Document,
    tokens: &[TokenSnapshot],
    violations: &[Violation],
    focused_id: Option<&str>,
    timing: DeletionTiming,
) -> ValidationPlan {
    let mut plan = ValidationPlan::default();
    let mut deleted: HashSet<&str> = HashSet::new();

    // 1. empty tokens left outside the creation flow
    for token in tokens {
        if token.value.is_empty() && Some(token.id.as_str()) != focused_id {
            deleted.insert(&token.id);
            plan.deletions.push(PlannedDeletion {
                token_id: token.id.clone(),
                rule_id: None,
            });
        }
    }

    // 2. rule deletions, when the value counts as confirmed
    let delete_now = timing.should_delete_now();
    for violation in violations {
        if violation.action != ViolationAction::Delete || !delete_now {
            continue;
        }
        for target in &violation.targets {
            let id = target.token_id.as_str();
            if (Some(id) == focused_id && !timing.focused_confirmed) || deleted.contains(id) {
                continue;
            }
            deleted.insert(id);
            plan.deletions.push(PlannedDeletion {
                token_id: target.token_id.clone(),
                rule_id: Some(violation.rule_id.clone()),
            });
        }
    }

    mark_and_clear(doc, violations, &deleted, &mut plan);
    plan
}

/// Marks and clears only, for the re-validation after deletions
pub fn build_mark_plan(doc: &Document, violations: &[Violation]) -> ValidationPlan {
    let mut plan = ValidationPlan::default();
    mark_and_clear(doc, violations, &HashSet::new(), &mut plan);
    plan
}

fn mark_and_clear(
    doc: &Document,
    violations: &[Violation],
    deleted: &HashSet<&str>,
    plan: &mut ValidationPlan,
) {
    // 3. everything still violating gets marked, first reason wins
    let mut marked: HashSet<&str> = HashSet::new();
    for violation in violations {
        for target in &violation.targets {
            let id = target.token_id.as_str();
            if deleted.contains(id) || !marked.insert(id) {
                continue;
            }
            plan.marks.push((target.token_id.clone(), violation.reason.clone()));
        }
    }

    // 4. clear stale invalid flags
    for (_, seg) in doc.tokens() {
        let Some(id) = seg.token_id() else {
            continue;
        };
        if seg.is_invalid() && !marked.contains(id) && !deleted.contains(id) {
            plan.clears.push(id.to_string());
        }
    }
}
