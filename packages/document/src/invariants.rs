//! Structural checks for a repaired document.
//!
//! Used by tests and debug assertions; the editor never surfaces these.

use crate::document::Document;
use crate::segment::Segment;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvariantViolation {
    MissingSpacerBefore { token_id: String },
    MissingSpacerAfter { token_id: String },
    OrphanedSpacer { index: usize },
    AdjacentText { index: usize },
    EmptyText { index: usize },
}

pub fn check_invariants(doc: &Document) -> Vec<InvariantViolation> {
    let segments = doc.segments();
    let mut violations = Vec::new();

    for (index, seg) in segments.iter().enumerate() {
        let prev = index.checked_sub(1).and_then(|i| segments.get(i));
        let next = segments.get(index + 1);

        match seg {
            Segment::Filter(_) | Segment::FreeText(_) => {
                let id = seg.token_id().unwrap_or_default().to_string();
                // A token at either edge only needs its inward spacer
                if prev.is_some_and(|p| !p.is_spacer()) {
                    violations.push(InvariantViolation::MissingSpacerBefore {
                        token_id: id.clone(),
                    });
                }
                if next.is_some_and(|n| !n.is_spacer()) {
                    violations.push(InvariantViolation::MissingSpacerAfter { token_id: id });
                }
            }
            Segment::Spacer => {
                let touches_token = prev.is_some_and(Segment::is_token)
                    || next.is_some_and(Segment::is_token);
                if !touches_token {
                    violations.push(InvariantViolation::OrphanedSpacer { index });
                }
            }
            Segment::PlainText { value } => {
                if value.is_empty() {
                    violations.push(InvariantViolation::EmptyText { index });
                }
                if next.is_some_and(Segment::is_text) {
                    violations.push(InvariantViolation::AdjacentText { index });
                }
            }
        }
    }

    violations
}

pub fn is_well_formed(doc: &Document) -> bool {
    check_invariants(doc).is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::FilterToken;

    fn token(id: &str) -> Segment {
        Segment::from(FilterToken::new(id, "k", "is", "v"))
    }

    #[test]
    fn test_well_formed_document() {
        let doc = Document::from_segments(vec![
            Segment::Spacer,
            token("a"),
            Segment::Spacer,
            token("b"),
            Segment::Spacer,
            Segment::text("tail"),
        ]);
        assert!(is_well_formed(&doc));
    }

    #[test]
    fn test_detects_missing_and_orphaned_spacers() {
        let doc = Document::from_segments(vec![
            Segment::text("x"),
            token("a"),
            Segment::Spacer,
            Segment::Spacer,
            Segment::text("y"),
        ]);
        let violations = check_invariants(&doc);
        assert!(violations.contains(&InvariantViolation::MissingSpacerBefore {
            token_id: "a".to_string()
        }));
        assert!(violations.contains(&InvariantViolation::OrphanedSpacer { index: 3 }));
    }
}
