use super::{RuleError, ValidationRule};
use crate::context::{RuleContext, TokenSnapshot};
use crate::violation::{Violation, ViolationAction};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which parts of a filter must match for two tokens to count as duplicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UniqueBy {
    #[default]
    Key,
    KeyOperator,
    Exact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UniqueStrategy {
    /// Mark the duplicate invalid
    #[default]
    Mark,
    /// Delete the newly added duplicate
    Reject,
    /// Delete the existing tokens in favour of the new one
    Replace,
}

/// Rule: at most one filter per key (or key+operator, or exact triple)
#[derive(Debug, Clone)]
pub struct Unique {
    by: UniqueBy,
    strategy: UniqueStrategy,
    keys: Vec<String>,
}

impl Unique {
    pub const ID: &'static str = "unique";

    pub fn rule(by: UniqueBy) -> Self {
        Self {
            by,
            strategy: UniqueStrategy::default(),
            keys: Vec::new(),
        }
    }

    pub fn strategy(mut self, strategy: UniqueStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Only enforce uniqueness for these keys
    pub fn keys(mut self, keys: Vec<String>) -> Self {
        self.keys = keys;
        self
    }

    fn group_key(&self, token: &TokenSnapshot) -> String {
        match self.by {
            UniqueBy::Key => token.key.clone(),
            UniqueBy::KeyOperator => format!("{}\u{0}{}", token.key, token.operator),
            UniqueBy::Exact => format!("{}\u{0}{}\u{0}{}", token.key, token.operator, token.value),
        }
    }

    fn reason(&self, token: &TokenSnapshot) -> String {
        match self.by {
            UniqueBy::Key => format!("Only one '{}' filter is allowed", token.key),
            UniqueBy::KeyOperator => format!(
                "Only one '{} {}' filter is allowed",
                token.key, token.operator
            ),
            UniqueBy::Exact => "Duplicate filter".to_string(),
        }
    }

    fn violation(&self, action: ViolationAction, token: &TokenSnapshot) -> Violation {
        Violation::with_action(Self::ID, action, self.reason(token)).with_target(&token.id, token.pos)
    }
}

impl ValidationRule for Unique {
    fn id(&self) -> &str {
        Self::ID
    }

    fn validate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let mut order = Vec::new();
        let mut groups: HashMap<String, Vec<&TokenSnapshot>> = HashMap::new();
        for token in ctx.filters() {
            if !self.keys.is_empty() && !self.keys.contains(&token.key) {
                continue;
            }
            let group = self.group_key(token);
            if !groups.contains_key(&group) {
                order.push(group.clone());
            }
            groups.entry(group).or_default().push(token);
        }

        let mut violations = Vec::new();
        for group in order {
            let Some(tokens) = groups.get(&group) else {
                continue;
            };
            if tokens.len() < 2 {
                continue;
            }

            let newest = ctx.newest_of(tokens);
            let newest_id = newest.map(|token| token.id.as_str());

            match (self.strategy, newest) {
                (UniqueStrategy::Replace, Some(newest)) => {
                    for token in tokens.iter().filter(|t| t.id != newest.id) {
                        violations.push(self.violation(ViolationAction::Delete, token));
                    }
                }
                (strategy, _) => {
                    // keep the oldest occurrence that is not the new one
                    let kept = tokens
                        .iter()
                        .find(|t| Some(t.id.as_str()) != newest_id)
                        .map(|t| t.id.as_str());
                    for token in tokens.iter().filter(|t| Some(t.id.as_str()) != kept) {
                        let action = if strategy == UniqueStrategy::Reject
                            && Some(token.id.as_str()) == newest_id
                        {
                            ViolationAction::Delete
                        } else {
                            ViolationAction::Mark
                        };
                        violations.push(self.violation(action, token));
                    }
                }
            }
        }

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;

    #[test]
    fn test_mark_second_occurrence() {
        let fx = Fixture::parse("status:is:active status:is:closed").new_token(1);
        let violations = Unique::rule(UniqueBy::Key).validate(&fx.ctx()).unwrap();

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].action, ViolationAction::Mark);
        assert!(violations[0].targets_token(&fx.id(1)));
    }

    #[test]
    fn test_reject_new_duplicate() {
        let fx = Fixture::parse("status:is:active status:is:closed").new_token(0);
        let violations = Unique::rule(UniqueBy::Key)
            .strategy(UniqueStrategy::Reject)
            .validate(&fx.ctx())
            .unwrap();

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].action, ViolationAction::Delete);
        assert!(violations[0].targets_token(&fx.id(0)));
    }

    #[test]
    fn test_replace_existing() {
        let fx = Fixture::parse("status:is:a status:is:b status:is:c").new_token(2);
        let violations = Unique::rule(UniqueBy::Key)
            .strategy(UniqueStrategy::Replace)
            .validate(&fx.ctx())
            .unwrap();

        let deleted: Vec<&str> = violations
            .iter()
            .filter(|v| v.action == ViolationAction::Delete)
            .flat_map(|v| v.targets.iter().map(|t| t.token_id.as_str()))
            .collect();
        assert_eq!(deleted, vec![fx.id(0), fx.id(1)]);
    }

    #[test]
    fn test_reject_without_new_token_only_marks() {
        // e.g. right after undo restored a duplicate
        let fx = Fixture::parse("status:is:a status:is:b");
        let violations = Unique::rule(UniqueBy::Key)
            .strategy(UniqueStrategy::Reject)
            .validate(&fx.ctx())
            .unwrap();

        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].action, ViolationAction::Mark);
        assert!(violations[0].targets_token(&fx.id(1)));
    }

    #[test]
    fn test_force_check_treats_last_as_new() {
        let fx = Fixture::parse("status:is:a status:is:b").forced();
        let violations = Unique::rule(UniqueBy::Key)
            .strategy(UniqueStrategy::Reject)
            .validate(&fx.ctx())
            .unwrap();

        assert_eq!(violations[0].action, ViolationAction::Delete);
        assert!(violations[0].targets_token(&fx.id(1)));
    }

    #[test]
    fn test_granularity() {
        let fx = Fixture::parse("status:is:a status:not:a").new_token(1);
        let ctx = fx.ctx();

        assert_eq!(Unique::rule(UniqueBy::Key).validate(&ctx).unwrap().len(), 1);
        assert!(Unique::rule(UniqueBy::KeyOperator).validate(&ctx).unwrap().is_empty());
        assert!(Unique::rule(UniqueBy::Exact).validate(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_key_scope() {
        let fx = Fixture::parse("tag:is:a tag:is:b status:is:x status:is:y").new_token(3);
        let violations = Unique::rule(UniqueBy::Key)
            .keys(vec!["status".to_string()])
            .validate(&fx.ctx())
            .unwrap();

        assert_eq!(violations.len(), 1);
        assert!(violations[0].targets_token(&fx.id(3)));
    }
}
