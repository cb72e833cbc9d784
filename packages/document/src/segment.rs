//! # Segments
//!
//! A document is a flat run of segments: plain text, spacers, and atomic
//! tokens. Each segment occupies a fixed number of positions:
//!
//! ```text
//! PlainText "abc"   → 3   (one per char)
//! Spacer            → 1
//! Token value "ab"  → 4   (open boundary + value + close boundary)
//! ```

use serde::{Deserialize, Serialize};

/// One `field operator value` triple
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterToken {
    pub id: String,
    pub key: String,
    pub operator: String,
    pub value: String,

    /// Immutable tokens can be deleted but not edited in place
    #[serde(default)]
    pub immutable: bool,

    #[serde(default)]
    pub invalid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
}

impl FilterToken {
    pub fn new(
        id: impl Into<String>,
        key: impl Into<String>,
        operator: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            key: key.into(),
            operator: operator.into(),
            value: value.into(),
            immutable: false,
            invalid: false,
            invalid_reason: None,
        }
    }

    pub fn immutable(mut self, immutable: bool) -> Self {
        self.immutable = immutable;
        self
    }
}

/// A span of free text promoted into an atomic unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeTextToken {
    pub id: String,
    pub value: String,

    /// Whether the text was written as `"..."`
    #[serde(default)]
    pub quoted: bool,

    #[serde(default)]
    pub invalid: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invalid_reason: Option<String>,
}

impl FreeTextToken {
    pub fn new(id: impl Into<String>, value: impl Into<String>, quoted: bool) -> Self {
        Self {
            id: id.into(),
            value: value.into(),
            quoted,
            invalid: false,
            invalid_reason: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TokenKind {
    Filter,
    FreeText,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Segment {
    PlainText { value: String },
    Spacer,
    Filter(FilterToken),
    FreeText(FreeTextToken),
}

impl Segment {
    pub fn text(value: impl Into<String>) -> Self {
        Segment::PlainText {
            value: value.into(),
        }
    }

    /// Number of document positions this segment occupies
    pub fn size(&self) -> usize {
        match self {
            Segment::PlainText { value } => value.chars().count(),
            Segment::Spacer => 1,
            Segment::Filter(token) => 2 + token.value.chars().count(),
            Segment::FreeText(token) => 2 + token.value.chars().count(),
        }
    }

    pub fn is_token(&self) -> bool {
        matches!(self, Segment::Filter(_) | Segment::FreeText(_))
    }

    pub fn is_spacer(&self) -> bool {
        matches!(self, Segment::Spacer)
    }

    pub fn is_text(&self) -> bool {
        matches!(self, Segment::PlainText { .. })
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Segment::PlainText { value } => Some(value),
            _ => None,
        }
    }

    pub fn token_kind(&self) -> Option<TokenKind> {
        match self {
            Segment::Filter(_) => Some(TokenKind::Filter),
            Segment::FreeText(_) => Some(TokenKind::FreeText),
            _ => None,
        }
    }

    pub fn token_id(&self) -> Option<&str> {
        match self {
            Segment::Filter(token) => Some(&token.id),
            Segment::FreeText(token) => Some(&token.id),
            _ => None,
        }
    }

    /// The editable value of a token
    pub fn token_value(&self) -> Option<&str> {
        match self {
            Segment::Filter(token) => Some(&token.value),
            Segment::FreeText(token) => Some(&token.value),
            _ => None,
        }
    }

    pub fn set_token_value(&mut self, value: impl Into<String>) {
        match self {
            Segment::Filter(token) => token.value = value.into(),
            Segment::FreeText(token) => token.value = value.into(),
            _ => {}
        }
    }

    pub fn is_immutable(&self) -> bool {
        matches!(self, Segment::Filter(token) if token.immutable)
    }

    pub fn is_invalid(&self) -> bool {
        match self {
            Segment::Filter(token) => token.invalid,
            Segment::FreeText(token) => token.invalid,
            _ => false,
        }
    }

    pub fn invalid_reason(&self) -> Option<&str> {
        match self {
            Segment::Filter(token) => token.invalid_reason.as_deref(),
            Segment::FreeText(token) => token.invalid_reason.as_deref(),
            _ => None,
        }
    }

    /// Set or clear the invalid flag; clearing also drops the reason
    pub fn set_invalid(&mut self, reason: Option<String>) {
        let (invalid, invalid_reason) = match self {
            Segment::Filter(token) => (&mut token.invalid, &mut token.invalid_reason),
            Segment::FreeText(token) => (&mut token.invalid, &mut token.invalid_reason),
            _ => return,
        };
        *invalid = reason.is_some();
        *invalid_reason = reason;
    }

    /// True for a plain-text run whose first char is whitespace
    pub fn starts_with_whitespace(&self) -> bool {
        self.as_text()
            .and_then(|text| text.chars().next())
            .is_some_and(char::is_whitespace)
    }

    /// True for a plain-text run whose last char is whitespace
    pub fn ends_with_whitespace(&self) -> bool {
        self.as_text()
            .and_then(|text| text.chars().next_back())
            .is_some_and(char::is_whitespace)
    }
}

impl From<FilterToken> for Segment {
    fn from(token: FilterToken) -> Self {
        Segment::Filter(token)
    }
}

impl From<FreeTextToken> for Segment {
    fn from(token: FreeTextToken) -> Self {
        Segment::FreeText(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_sizes() {
        assert_eq!(Segment::text("héllo").size(), 5);
        assert_eq!(Segment::Spacer.size(), 1);
        assert_eq!(Segment::from(FilterToken::new("1", "status", "is", "")).size(), 2);
        assert_eq!(Segment::from(FreeTextToken::new("2", "abc", false)).size(), 5);
    }

    #[test]
    fn test_set_invalid_clears_reason() {
        let mut seg = Segment::from(FilterToken::new("1", "status", "is", "x"));
        seg.set_invalid(Some("bad".to_string()));
        assert!(seg.is_invalid());
        assert_eq!(seg.invalid_reason(), Some("bad"));

        seg.set_invalid(None);
        assert!(!seg.is_invalid());
        assert_eq!(seg.invalid_reason(), None);
    }

    #[test]
    fn test_segment_serialization_is_tagged() {
        let seg = Segment::from(FilterToken::new("1", "status", "is", "active"));
        let json = serde_json::to_value(&seg).unwrap();
        assert_eq!(json["type"], "filter");
        assert_eq!(json["key"], "status");

        let back: Segment = serde_json::from_value(json).unwrap();
        assert_eq!(back, seg);
    }
}
