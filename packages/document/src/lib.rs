//! # Querybar Document
//!
//! Segment model and text plumbing for the structured query editor.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ parser: query string → segments             │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ document: text | spacer | token             │
//! │  - derived positions                        │
//! │  - transactions with step maps              │
//! │  - spacer/boundary primitives               │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ serializer / snapshot: document → outputs   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use querybar_document::{parse, serialize, IdGenerator, ParseOptions};
//!
//! let options = ParseOptions::new(':');
//! let doc = parse("status:is:active", &options, &mut IdGenerator::default());
//!
//! assert_eq!(doc.token_count(), 1);
//! assert_eq!(serialize(&doc, ':'), "status:is:active");
//! ```

pub mod document;
pub mod error;
pub mod field;
pub mod id_generator;
pub mod invariants;
pub mod lexer;
pub mod parser;
pub mod segment;
pub mod selection;
pub mod serializer;
pub mod snapshot;
pub mod spacer;
pub mod transaction;

pub use document::{Document, ReplaceOutcome, ResolvedPos, TokenLocation};
pub use error::{DocumentError, DocumentResult};
pub use field::{FieldDefinition, FieldRegistry, FieldType};
pub use id_generator::IdGenerator;
pub use invariants::{check_invariants, is_well_formed, InvariantViolation};
pub use parser::{classify_word, parse, parse_segments, FreeTextMode, ParseOptions, WordKind};
pub use segment::{FilterToken, FreeTextToken, Segment, TokenKind};
pub use selection::Selection;
pub use serializer::{serialize, Serializer};
pub use snapshot::{Snapshot, SnapshotSegment};
pub use spacer::{
    apply_spacer_deletion, apply_spacer_deletions, check_boundary_needs_space,
    expand_with_spacers, merge_overlapping_ranges, SpacerRange,
};
pub use transaction::{
    Assoc, HistoryOp, InputKind, Mapping, Step, StepMap, Transaction, TransactionMeta,
};
