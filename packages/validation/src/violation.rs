use serde::{Deserialize, Serialize};

/// What the engine should do with the offending tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViolationAction {
    Mark,
    Delete,
}

/// A token a violation refers to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViolationTarget {
    pub token_id: String,
    pub pos: usize,
}

/// A rule's report that one or more tokens fail a constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Violation {
    /// The rule that generated this violation
    pub rule_id: String,

    pub targets: Vec<ViolationTarget>,

    pub action: ViolationAction,

    /// Human-readable reason, shown on the token
    pub reason: String,
}

impl Violation {
    pub fn mark(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            targets: Vec::new(),
            action: ViolationAction::Mark,
            reason: reason.into(),
        }
    }

    pub fn delete(rule_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            rule_id: rule_id.into(),
            targets: Vec::new(),
            action: ViolationAction::Delete,
            reason: reason.into(),
        }
    }

    pub fn with_action(rule_id: impl Into<String>, action: ViolationAction, reason: impl Into<String>) -> Self {
        match action {
            ViolationAction::Mark => Self::mark(rule_id, reason),
            ViolationAction::Delete => Self::delete(rule_id, reason),
        }
    }

    pub fn with_target(mut self, token_id: impl Into<String>, pos: usize) -> Self {
        self.targets.push(ViolationTarget {
            token_id: token_id.into(),
            pos,
        });
        self
    }

    pub fn targets_token(&self, token_id: &str) -> bool {
        self.targets.iter().any(|t| t.token_id == token_id)
    }
}
