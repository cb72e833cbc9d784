//! # Token Focus
//!
//! ```text
//!              click / Backspace / Delete / trigger / suggestion
//!   Unfocused ─────────────────────────────────────────────────► Focused
//!       ▲                                                          │
//!       └──── blur, 2nd Escape, token removed from the document ───┘
//! ```
//!
//! Focus keeps the token id, never a position. The position is looked up
//! in the current document on every access.

use querybar_document::{Document, TokenLocation};
use serde::{Deserialize, Serialize};

/// Side the token was entered from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryDirection {
    /// Entered from the left, cursor at the start of the value
    Left,
    /// Entered from the right, cursor at the end of the value
    Right,
}

/// Which inner element receives focus first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FocusPolicy {
    /// Full keyboard traversal, including peripheral controls
    All,
    /// Straight to the value editor
    Entry,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenFocus {
    pub token_id: String,
    /// Char offset inside the token value
    pub cursor: usize,
    pub direction: EntryDirection,
    pub policy: FocusPolicy,
    pub suggestion_open: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EscapeOutcome {
    ClosedSuggestion,
    /// Focus left the token with this id
    Exited(String),
    Ignored,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FocusState {
    #[default]
    Unfocused,
    Focused(TokenFocus),
}

impl FocusState {
    pub fn focused(&self) -> Option<&TokenFocus> {
        match self {
            FocusState::Focused(focus) => Some(focus),
            FocusState::Unfocused => None,
        }
    }

    pub fn focused_mut(&mut self) -> Option<&mut TokenFocus> {
        match self {
            FocusState::Focused(focus) => Some(focus),
            FocusState::Unfocused => None,
        }
    }

    pub fn focused_id(&self) -> Option<&str> {
        self.focused().map(|focus| focus.token_id.as_str())
    }

    pub fn is_focused(&self) -> bool {
        matches!(self, FocusState::Focused(_))
    }

    pub fn focus(&mut self, token_id: impl Into<String>, cursor: usize, direction: EntryDirection, policy: FocusPolicy) {
        *self = FocusState::Focused(TokenFocus {
            token_id: token_id.into(),
            cursor,
            direction,
            policy,
            suggestion_open: false,
        });
    }

    /// Leave the token; returns the id that lost focus
    pub fn blur(&mut self) -> Option<String> {
        match std::mem::take(self) {
            FocusState::Focused(focus) => Some(focus.token_id),
            FocusState::Unfocused => None,
        }
    }

    /// First Escape closes the suggestion list, the second leaves the token
    pub fn escape(&mut self) -> EscapeOutcome {
        if let Some(focus) = self.focused_mut() {
            if focus.suggestion_open {
                focus.suggestion_open = false;
                return EscapeOutcome::ClosedSuggestion;
            }
        }
        match self.blur() {
            Some(id) => EscapeOutcome::Exited(id),
            None => EscapeOutcome::Ignored,
        }
    }

    pub fn set_suggestion_open(&mut self, open: bool) {
        if let Some(focus) = self.focused_mut() {
            focus.suggestion_open = open;
        }
    }

    /// Where the focused token currently is
    pub fn location(&self, doc: &Document) -> Option<TokenLocation> {
        self.focused_id().and_then(|id| doc.find_token(id))
    }

    /// Re-resolve against `doc`. Focus on a token that no longer exists is
    /// dropped and its id returned; the cursor is clamped to the value.
    pub fn reconcile(&mut self, doc: &Document) -> Option<String> {
        let focus = self.focused_mut()?;
        match doc.token(&focus.token_id).and_then(|seg| seg.token_value()) {
            Some(value) => {
                focus.cursor = focus.cursor.min(value.chars().count());
                None
            }
            None => self.blur(),
        }
    }
}
