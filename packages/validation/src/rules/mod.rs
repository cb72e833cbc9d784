mod max_count;
mod require_enum;
mod require_pattern;
mod unique;

pub use max_count::MaxCount;
pub use require_enum::RequireEnum;
pub use require_pattern::RequirePattern;
pub use unique::{Unique, UniqueBy, UniqueStrategy};

use crate::context::RuleContext;
use crate::violation::{Violation, ViolationAction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuleError {
    #[error("Rule '{rule_id}' failed: {message}")]
    Failed { rule_id: String, message: String },

    #[error("Invalid pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

impl RuleError {
    pub fn failed(rule_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Failed {
            rule_id: rule_id.into(),
            message: message.into(),
        }
    }
}

/// Trait for implementing validation rules
///
/// Rules are foreign code from the engine's point of view: a rule that
/// returns an error is logged and skipped, the pass carries on.
pub trait ValidationRule: Send + Sync {
    /// Unique identifier for this rule, used by per-field overrides
    fn id(&self) -> &str;

    /// Higher priority rules run first
    fn priority(&self) -> i32 {
        0
    }

    fn validate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError>;
}

type RuleFn = dyn Fn(&RuleContext<'_>) -> Result<Vec<Violation>, RuleError> + Send + Sync;

/// A rule backed by a closure
pub struct CustomRule {
    id: String,
    priority: i32,
    check: Box<RuleFn>,
}

impl CustomRule {
    pub fn new<F>(id: impl Into<String>, check: F) -> Self
    where
        F: Fn(&RuleContext<'_>) -> Result<Vec<Violation>, RuleError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            priority: 0,
            check: Box::new(check),
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl ValidationRule for CustomRule {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn validate(&self, ctx: &RuleContext<'_>) -> Result<Vec<Violation>, RuleError> {
        (self.check)(ctx)
    }
}

impl std::fmt::Debug for CustomRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomRule")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Mark or reject, for rules that only need the two basic behaviours
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkOrReject {
    #[default]
    Mark,
    Reject,
}

impl MarkOrReject {
    pub fn action(&self) -> ViolationAction {
        match self {
            MarkOrReject::Mark => ViolationAction::Mark,
            MarkOrReject::Reject => ViolationAction::Delete,
        }
    }
}

/// Declarative rule configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RuleSpec {
    #[serde(rename_all = "camelCase")]
    Unique {
        #[serde(default)]
        by: UniqueBy,
        #[serde(default)]
        strategy: UniqueStrategy,
        /// Restrict to these keys; empty means every key
        #[serde(default)]
        keys: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    MaxCount {
        max: usize,
        #[serde(default)]
        key: Option<String>,
        #[serde(default)]
        strategy: MarkOrReject,
    },
    #[serde(rename_all = "camelCase")]
    RequirePattern {
        #[serde(default)]
        key: Option<String>,
        pattern: String,
        #[serde(default)]
        strategy: MarkOrReject,
        #[serde(default)]
        message: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    RequireEnum {
        #[serde(default)]
        strategy: MarkOrReject,
    },
}

impl RuleSpec {
    pub fn build(&self) -> Result<Box<dyn ValidationRule>, RuleError> {
        let rule: Box<dyn ValidationRule> = match self {
            RuleSpec::Unique { by, strategy, keys } => {
                Box::new(Unique::rule(*by).strategy(*strategy).keys(keys.clone()))
            }
            RuleSpec::MaxCount { max, key, strategy } => {
                let rule = match key {
                    Some(key) => MaxCount::per_key(key.clone(), *max),
                    None => MaxCount::global(*max),
                };
                Box::new(rule.strategy(*strategy))
            }
            RuleSpec::RequirePattern {
                key,
                pattern,
                strategy,
                message,
            } => {
                let mut rule = RequirePattern::new(pattern)?.strategy(*strategy);
                if let Some(key) = key {
                    rule = rule.for_key(key.clone());
                }
                if let Some(message) = message {
                    rule = rule.message(message.clone());
                }
                Box::new(rule)
            }
            RuleSpec::RequireEnum { strategy } => Box::new(RequireEnum::new().strategy(*strategy)),
        };
        Ok(rule)
    }
}

/// Registry of configured validation rules
pub struct RuleRegistry {
    rules: Vec<Box<dyn ValidationRule>>,
}

impl RuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn from_specs(specs: &[RuleSpec]) -> Result<Self, RuleError> {
        let mut registry = Self::new();
        for spec in specs {
            registry.add_rule(spec.build()?);
        }
        Ok(registry)
    }

    /// Add a custom rule to the registry
    pub fn add_rule(&mut self, rule: Box<dyn ValidationRule>) {
        self.rules.push(rule);
    }

    pub fn with_rule(mut self, rule: impl ValidationRule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    /// Get all registered rules
    pub fn rules(&self) -> &[Box<dyn ValidationRule>] {
        &self.rules
    }

    /// Rules in execution order: descending priority, registration order on ties
    pub fn by_priority(&self) -> Vec<&dyn ValidationRule> {
        let mut rules: Vec<&dyn ValidationRule> = self.rules.iter().map(|r| r.as_ref()).collect();
        rules.sort_by_key(|rule| std::cmp::Reverse(rule.priority()));
        rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RuleRegistry")
            .field("rules", &format!("{} rules", self.rules.len()))
            .finish()
    }
}
