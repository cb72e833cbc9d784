//! # Querybar Editor
//!
//! Editing engine for the structured query bar.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ input: keys, text, clicks, IME, history     │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: one transaction per user operation  │
//! │  - selection guard and token focus          │
//! │  - auto-tokenize free text                  │
//! │  - repair pipeline (spacer invariant)       │
//! │  - undo/redo history                        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ validation: rules → delete / mark tokens    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ events: change, submit, token set, focus    │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Document is source of truth**: focus and history keep token ids,
//!    positions are resolved on access
//! 2. **Every edit is a transaction**: repair and validation append to it
//!    or follow it, never mutate around it
//! 3. **Structural damage heals silently**: only rule violations reach the
//!    caller, as token state
//!
//! ## Usage
//!
//! ```rust
//! use querybar_editor::{EditorConfig, QueryEditor};
//!
//! let mut editor = QueryEditor::new(EditorConfig::default()).unwrap();
//! editor.set_value("status:is:active priority:is:high").unwrap();
//!
//! assert_eq!(editor.doc().token_count(), 2);
//! assert_eq!(editor.value(), "status:is:active priority:is:high");
//! ```

mod config;
mod editor;
mod errors;
mod events;
mod focus;
mod history;
mod keyboard;
mod repair;
mod selection_guard;
mod tokenize;

pub use config::{EditorConfig, ValidationConfig};
pub use editor::QueryEditor;
pub use errors::{EditorError, EditorResult};
pub use events::{committed_tokens, CommittedToken, EditorEvent};
pub use focus::{EntryDirection, EscapeOutcome, FocusPolicy, FocusState, TokenFocus};
pub use history::{History, HistoryEntry};
pub use keyboard::{boundary_delete, detect_colon_trigger, ColonTrigger, Key, KeyEvent};
pub use repair::{
    repair_document, AdjacentText, EmptyTokenCleanup, HistoryEmptyTokenFocus, MissingSpacer, OrphanedSpacerCleanup,
    RepairContext, RepairPhase, RepairPipeline,
};
pub use selection_guard::{
    collapse_range, enforce_selection_invariant, extend_selection, get_cursor_inside_token, next_stop,
    resolve_cursor_inside_token, skip_spacers_left, skip_spacers_right, GuardAction, InsideToken,
};
pub use tokenize::{text_words, AutoTokenizer, TextWord};

// Re-export document types for convenience
pub use querybar_document::{Document, FieldDefinition, FreeTextMode, Segment, Selection, Snapshot};
pub use querybar_validation::{RuleRegistry, RuleSpec};
