//! # Token Snapshots
//!
//! Validation never holds on to document positions across transactions.
//! Every pass collects a fresh snapshot of the tokens and diffs it by id
//! against the previous document.

use crate::violation::ViolationAction;
use querybar_document::{Document, FieldRegistry, Segment, TokenKind};
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSnapshot {
    pub id: String,
    pub kind: TokenKind,
    pub pos: usize,
    pub key: String,
    pub operator: String,
    pub value: String,
}

impl TokenSnapshot {
    pub fn is_filter(&self) -> bool {
        self.kind == TokenKind::Filter
    }

    fn same_content(&self, other: &TokenSnapshot) -> bool {
        self.key == other.key && self.operator == other.operator && self.value == other.value
    }
}

/// Collect every token in document order
pub fn collect_tokens(doc: &Document) -> Vec<TokenSnapshot> {
    doc.tokens()
        .filter_map(|(location, seg)| match seg {
            Segment::Filter(token) => Some(TokenSnapshot {
                id: token.id.clone(),
                kind: TokenKind::Filter,
                pos: location.pos,
                key: token.key.clone(),
                operator: token.operator.clone(),
                value: token.value.clone(),
            }),
            Segment::FreeText(token) => Some(TokenSnapshot {
                id: token.id.clone(),
                kind: TokenKind::FreeText,
                pos: location.pos,
                key: String::new(),
                operator: String::new(),
                value: token.value.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Tokens that appeared or changed between two snapshots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenDiff {
    pub new_token_ids: HashSet<String>,
    pub modified_token_ids: HashSet<String>,
}

pub fn diff_tokens(old: &[TokenSnapshot], new: &[TokenSnapshot]) -> TokenDiff {
    let old_by_id: HashMap<&str, &TokenSnapshot> =
        old.iter().map(|token| (token.id.as_str(), token)).collect();

    let mut diff = TokenDiff::default();
    for token in new {
        match old_by_id.get(token.id.as_str()) {
            None => {
                diff.new_token_ids.insert(token.id.clone());
            }
            Some(previous) if !previous.same_content(token) => {
                diff.modified_token_ids.insert(token.id.clone());
            }
            Some(_) => {}
        }
    }
    diff
}

/// Everything a rule may look at
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub tokens: &'a [TokenSnapshot],
    pub new_token_ids: &'a HashSet<String>,
    pub modified_token_ids: &'a HashSet<String>,
    /// New or modified tokens plus the focused and just-blurred token
    pub editing_token_ids: &'a HashSet<String>,
    pub fields: &'a FieldRegistry,
    pub force_check: bool,
}

impl<'a> RuleContext<'a> {
    pub fn filters(&self) -> impl Iterator<Item = &'a TokenSnapshot> {
        self.tokens.iter().filter(|token| token.is_filter())
    }

    pub fn is_editing(&self, token_id: &str) -> bool {
        self.editing_token_ids.contains(token_id)
    }

    /// Deletion is reserved for tokens the current edit touched (or every
    /// token on a forced check); anything else is only marked.
    pub fn scoped_action(&self, action: ViolationAction, token_id: &str) -> ViolationAction {
        match action {
            ViolationAction::Delete if !self.force_check && !self.is_editing(token_id) => ViolationAction::Mark,
            action => action,
        }
    }

    /// Pick the most recently touched token among `candidates`.
    ///
    /// New tokens win over modified ones, which win over the focused or
    /// just-blurred token. With nothing touched, the last candidate is used
    /// only on a forced check.
    pub fn newest_of<'t>(&self, candidates: &[&'t TokenSnapshot]) -> Option<&'t TokenSnapshot> {
        let last_in = |set: &HashSet<String>| {
            candidates
                .iter()
                .rev()
                .find(|token| set.contains(&token.id))
                .copied()
        };

        last_in(self.new_token_ids)
            .or_else(|| last_in(self.modified_token_ids))
            .or_else(|| last_in(self.editing_token_ids))
            .or_else(|| {
                if self.force_check {
                    candidates.last().copied()
                } else {
                    None
                }
            })
    }
}
