use super::{MarkOrReject, RuleError, ValidationRule};
use crate::context::RuleContext;
use crate::violation::Violation;
use querybar_document::FieldType;

/// Rule: values of enum fields must be one of the declared values
#[derive(Debug, Clone, Default)]
pub struct RequireEnum {
    strategy: MarkOrReject,
}

impl RequireEnum {
    pub const ID: &'static str = "require-enum";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn strategy(mut self, strategy: MarkOrReject) -> Self {
        self.strategy = strategy;
        self
    }
}

impl ValidationRule for RequireEnum {
    fn id(&self) -> &str {
        Self::ID
    }

    fn validate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let action = self.strategy.action();
        let mut violations = Vec::new();

        for token in ctx.filters() {
            let Some(field) = ctx.fields.get(&token.key) else {
                continue;
            };
            if field.field_type != FieldType::Enum || field.enum_values.is_empty() {
                continue;
            }
            if token.value.is_empty() || field.enum_values.contains(&token.value) {
                continue;
            }
            let reason = format!(
                "'{}' is not a valid {}; expected one of: {}",
                token.value,
                field.label,
                field.enum_values.join(", ")
            );
            violations.push(
                Violation::with_action(Self::ID, ctx.scoped_action(action, &token.id), reason)
                    .with_target(&token.id, token.pos),
            );
        }

        Ok(violations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Fixture;
    use crate::violation::ViolationAction;
    use querybar_document::{FieldDefinition, FieldRegistry};

    fn fields() -> FieldRegistry {
        FieldRegistry::new(vec![
            FieldDefinition::new("status").with_enum_values(["active", "closed"]),
            FieldDefinition::new("name"),
        ])
    }

    #[test]
    fn test_enum_membership() {
        let fx = Fixture::parse("status:is:active status:is:bogus name:is:bogus").fields(fields());
        let violations = RequireEnum::new().validate(&fx.ctx()).unwrap();

        assert_eq!(violations.len(), 1);
        assert!(violations[0].targets_token(&fx.id(1)));
        assert!(violations[0].reason.contains("active, closed"));
    }

    #[test]
    fn test_reject_spares_untouched_tokens() {
        let rule = RequireEnum::new().strategy(MarkOrReject::Reject);
        let fx = Fixture::parse("status:is:bogus status:is:nope").fields(fields()).new_token(1);
        let actions: Vec<_> = rule.validate(&fx.ctx()).unwrap().into_iter().map(|v| v.action).collect();

        assert_eq!(actions, vec![ViolationAction::Mark, ViolationAction::Delete]);
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let fx = Fixture::parse("other:is:anything").fields(fields());
        assert!(RequireEnum::new().validate(&fx.ctx()).unwrap().is_empty());
    }
}
