//! # Query Validation
//!
//! Rule-based lifecycle decisions for the tokens of a query document.
//!
//! ```text
//! ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//! │   context    │──►│    rules     │──►│   planner    │
//! │ (snapshots)  │   │ (violations) │   │ (del/mark)   │
//! └──────────────┘   └──────────────┘   └──────┬───────┘
//!                                              ▼
//!                                      ┌────────────────┐
//!                                      │     engine     │
//!                                      │ (transactions) │
//!                                      └────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use querybar_document::{parse, FieldRegistry, IdGenerator, ParseOptions};
//! use querybar_validation::{RuleRegistry, Unique, UniqueBy, ValidationEngine, ValidationInput};
//!
//! let engine = ValidationEngine::new(RuleRegistry::new().with_rule(Unique::rule(UniqueBy::Key)));
//! let doc = parse("status:is:a status:is:b", &ParseOptions::new(':'), &mut IdGenerator::default());
//!
//! let outcome = engine.run(&ValidationInput::forced(&doc), &FieldRegistry::default()).unwrap();
//! assert_eq!(outcome.violations.len(), 1);
//! ```

pub mod context;
pub mod engine;
pub mod planner;
pub mod rules;
pub mod violation;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{collect_tokens, diff_tokens, RuleContext, TokenDiff, TokenSnapshot};
pub use engine::{ValidationEngine, ValidationInput, ValidationOutcome};
pub use planner::{apply_field_overrides, build_mark_plan, build_plan, DeletionTiming, PlannedDeletion, ValidationPlan};
pub use rules::{
    CustomRule, MarkOrReject, MaxCount, RequireEnum, RequirePattern, RuleError, RuleRegistry, RuleSpec, Unique,
    UniqueBy, UniqueStrategy, ValidationRule,
};
pub use violation::{Violation, ViolationAction, ViolationTarget};
