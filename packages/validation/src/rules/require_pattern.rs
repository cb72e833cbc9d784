use super::{MarkOrReject, RuleError, ValidationRule};
use crate::context::RuleContext;
use crate::violation::Violation;
use regex::Regex;

/// Rule: filter values must match a regular expression
///
/// Empty values are skipped, they belong to a token still being created.
#[derive(Debug, Clone)]
pub struct RequirePattern {
    pattern: Regex,
    key: Option<String>,
    strategy: MarkOrReject,
    message: Option<String>,
}

impl RequirePattern {
    pub const ID: &'static str = "require-pattern";

    pub fn new(pattern: &str) -> Result<Self, RuleError> {
        let pattern = Regex::new(pattern).map_err(|e| RuleError::InvalidPattern {
            pattern: pattern.to_string(),
            message: e.to_string(),
        })?;
        Ok(Self {
            pattern,
            key: None,
            strategy: MarkOrReject::default(),
            message: None,
        })
    }

    pub fn for_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn strategy(mut self, strategy: MarkOrReject) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ValidationRule for RequirePattern {
    fn id(&self) -> &str {
        Self::ID
    }

    fn validate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let action = self.strategy.action();
        let violations = ctx
            .filters()
            .filter(|token| self.key.as_ref().map_or(true, |key| &token.key == key))
            .filter(|token| !token.value.is_empty() && !self.pattern.is_match(&token.value))
            .map(|token| {
                let reason = self
                    .message
                    .clone()
                    .unwrap_or_else(|| format!("Value must match {}", self.pattern.as_str()));
                Violation::with_action(Self::ID, ctx.scoped_action(action, &token.id), reason).with_target(&token.id, token.pos)
            })
            .collect();
        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use crate::violation::ViolationAction;

    #[test]
    fn test_pattern_mismatch() {
        let fx = Fixture::parse("id:is:42 id:is:abc name:is:abc");
        let rule = RequirePattern::new("^[0-9]+$").unwrap().for_key("id");
        let violations = rule.validate(&fx.ctx()).unwrap();

        assert_eq!(violations.len(), 1);
        assert!(violations[0].targets_token(&fx.id(1)));
        assert_eq!(violations[0].reason, "Value must match ^[0-9]+$");
    }

    #[test]
    fn test_reject_only_deletes_edited_tokens() {
        let rule = RequirePattern::new("^[0-9]+$").unwrap().strategy(MarkOrReject::Reject);

        let untouched = Fixture::parse("id:is:abc id:is:x").editing(1);
        let violations = rule.validate(&untouched.ctx()).unwrap();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].action, ViolationAction::Mark);
        assert_eq!(violations[1].action, ViolationAction::Delete);

        let forced = Fixture::parse("id:is:abc").forced();
        assert_eq!(rule.validate(&forced.ctx()).unwrap()[0].action, ViolationAction::Delete);
    }

    #[test]
    fn test_empty_value_is_skipped() {
        let fx = Fixture::parse("id:is:");
        let rule = RequirePattern::new("^[0-9]+$").unwrap();
        assert!(rule.validate(&fx.ctx()).unwrap().is_empty());
    }

    #[test]
    fn test_custom_message() {
        let fx = Fixture::parse("id:is:x");
        let rule = RequirePattern::new("^[0-9]+$").unwrap().message("numbers only");
        let violations = rule.validate(&fx.ctx()).unwrap();
        assert_eq!(violations[0].reason, "numbers only");
    }
}
