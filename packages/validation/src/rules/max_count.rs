use super::{MarkOrReject, RuleError, ValidationRule};
use crate::context::{RuleContext, TokenSnapshot};
use crate::violation::Violation;

/// Rule: cap the number of filters, overall or for one key
#[derive(Debug, Clone)]
pub struct MaxCount {
    max: usize,
    key: Option<String>,
    strategy: MarkOrReject,
}

impl MaxCount {
    pub const ID: &'static str = "max-count";

    pub fn global(max: usize) -> Self {
        Self {
            max,
            key: None,
            strategy: MarkOrReject::default(),
        }
    }

    pub fn per_key(key: impl Into<String>, max: usize) -> Self {
        Self {
            max,
            key: Some(key.into()),
            strategy: MarkOrReject::default(),
        }
    }

    pub fn strategy(mut self, strategy: MarkOrReject) -> Self {
        self.strategy = strategy;
        self
    }

    fn reason(&self) -> String {
        match &self.key {
            Some(key) => format!("At most {} '{}' filters are allowed", self.max, key),
            None => format!("At most {} filters are allowed", self.max),
        }
    }
}

impl ValidationRule for MaxCount {
    fn id(&self) -> &str {
        Self::ID
    }

    fn validate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        let counted: Vec<&TokenSnapshot> = ctx
            .filters()
            .filter(|token| self.key.as_ref().map_or(true, |key| &token.key == key))
            .collect();

        if counted.len() <= self.max {
            return Ok(Vec::new());
        }
        let overflow = counted.len() - self.max;

        // Tokens being edited overflow first, then whatever sits last
        let mut picked: Vec<&TokenSnapshot> = counted
            .iter()
            .rev()
            .filter(|token| ctx.is_editing(&token.id))
            .take(overflow)
            .copied()
            .collect();
        for token in counted.iter().rev() {
            if picked.len() == overflow {
                break;
            }
            if !picked.iter().any(|p| p.id == token.id) {
                picked.push(token);
            }
        }
        picked.sort_by_key(|token| token.pos);

        let action = self.strategy.action();
        Ok(picked
            .into_iter()
            .map(|token| Violation::with_action(Self::ID, action, self.reason()).with_target(&token.id, token.pos))
            .collect())
    }
}
