//! # Selection Guard
//!
//! Keeps the cursor out of token interiors. A collapsed cursor may rest at
//! a token boundary; moving into the token across that boundary enters
//! value editing instead.
//!
//! ```text
//!   text |[status:is:open]| text
//!        ▲ ArrowRight here focuses the token (value offset 0)
//! ```
//!
//! Runs of spacers are treated as zero-width by every movement helper.

use crate::focus::{EntryDirection, FocusPolicy};
use querybar_document::{Document, Segment, Selection, TokenLocation};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardAction {
    /// Put a collapsed cursor here
    Move(usize),
    /// Enter value editing of a token
    Focus {
        token_id: String,
        cursor: usize,
        direction: EntryDirection,
        policy: FocusPolicy,
    },
    /// Replace the selection, e.g. with a whole immutable token
    Select(Selection),
}

/// A cursor found strictly inside a token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InsideToken {
    pub token_id: String,
    pub from: usize,
    pub to: usize,
    pub immutable: bool,
}

pub fn skip_spacers_right(doc: &Document, mut pos: usize) -> usize {
    while doc.node_after(pos).is_some_and(|(_, seg)| seg.is_spacer()) {
        pos += 1;
    }
    pos
}

pub fn skip_spacers_left(doc: &Document, mut pos: usize) -> usize {
    while doc.node_before(pos).is_some_and(|(_, seg)| seg.is_spacer()) {
        pos -= 1;
    }
    pos
}

/// Token ending exactly at `pos`
pub(crate) fn token_before(doc: &Document, pos: usize) -> Option<TokenLocation> {
    let (index, seg) = doc.node_before(pos)?;
    seg.is_token().then(|| TokenLocation {
        index,
        pos: pos - seg.size(),
        size: seg.size(),
    })
}

fn segment<'a>(doc: &'a Document, location: &TokenLocation) -> Option<&'a Segment> {
    doc.get(location.index)
}

fn value_len(seg: &Segment) -> usize {
    seg.token_value().map_or(0, |value| value.chars().count())
}

fn enter(seg: &Segment, direction: EntryDirection, cursor: usize, policy: FocusPolicy) -> Option<GuardAction> {
    Some(GuardAction::Focus {
        token_id: seg.token_id()?.to_string(),
        cursor,
        direction,
        policy,
    })
}

/// Directional correction for a collapsed cursor.
///
/// `direction` is the sign of the movement; `0` (a click) never corrects.
pub fn enforce_selection_invariant(doc: &Document, cursor: usize, direction: i32) -> Option<GuardAction> {
    if direction > 0 {
        let pos = skip_spacers_right(doc, cursor);
        let location = doc.token_at(pos)?;
        let seg = segment(doc, &location)?;
        if seg.is_immutable() {
            return Some(GuardAction::Move(location.end()));
        }
        enter(seg, EntryDirection::Left, 0, FocusPolicy::All)
    } else if direction < 0 {
        let pos = skip_spacers_left(doc, cursor);
        let location = token_before(doc, pos)?;
        let seg = segment(doc, &location)?;
        if seg.is_immutable() {
            return Some(GuardAction::Move(location.pos));
        }
        enter(seg, EntryDirection::Right, value_len(seg), FocusPolicy::All)
    } else {
        None
    }
}

/// Detect the illegal state of a collapsed cursor strictly inside a token
pub fn get_cursor_inside_token(doc: &Document, pos: usize) -> Option<InsideToken> {
    let location = doc.token_containing(pos)?;
    let seg = segment(doc, &location)?;
    Some(InsideToken {
        token_id: seg.token_id()?.to_string(),
        from: location.pos,
        to: location.end(),
        immutable: seg.is_immutable(),
    })
}

/// Snap immutable tokens to the nearer boundary, enter mutable ones from
/// the nearer side.
pub fn resolve_cursor_inside_token(doc: &Document, pos: usize) -> Option<GuardAction> {
    let inside = get_cursor_inside_token(doc, pos)?;
    let left_is_closer = pos - inside.from <= inside.to - pos;

    if inside.immutable {
        let target = if left_is_closer { inside.from } else { inside.to };
        return Some(GuardAction::Move(target));
    }

    let seg = doc.token(&inside.token_id)?;
    if left_is_closer {
        enter(seg, EntryDirection::Left, 0, FocusPolicy::All)
    } else {
        enter(seg, EntryDirection::Right, value_len(seg), FocusPolicy::All)
    }
}

/// A range selection collapsed onto a token boundary (or into a token).
pub fn collapse_range(doc: &Document, previous: Selection, next: Selection) -> Option<GuardAction> {
    if previous.is_empty() || !next.is_empty() {
        return None;
    }
    let pos = next.head;

    if let Some(inside) = get_cursor_inside_token(doc, pos) {
        if inside.immutable {
            return Some(GuardAction::Select(Selection::new(inside.from, inside.to)));
        }
        return resolve_cursor_inside_token(doc, pos);
    }

    if let Some(location) = doc.token_at(pos) {
        let seg = segment(doc, &location)?;
        if seg.is_immutable() {
            return Some(GuardAction::Select(Selection::new(location.pos, location.end())));
        }
        return enter(seg, EntryDirection::Left, 0, FocusPolicy::All);
    }

    if let Some(location) = token_before(doc, pos) {
        let seg = segment(doc, &location)?;
        if seg.is_immutable() {
            return Some(GuardAction::Select(Selection::new(location.pos, location.end())));
        }
        return enter(seg, EntryDirection::Right, value_len(seg), FocusPolicy::All);
    }

    None
}

/// Next cursor stop in `direction`. Spacer runs are zero-width; a token is
/// passed over whole, together with one flanking spacer.
pub fn next_stop(doc: &Document, head: usize, direction: i32) -> usize {
    if direction > 0 {
        let pos = skip_spacers_right(doc, head);
        if let Some(location) = doc.token_at(pos) {
            let end = location.end();
            return if doc.node_after(end).is_some_and(|(_, seg)| seg.is_spacer()) {
                end + 1
            } else {
                end
            };
        }
        (pos + 1).min(doc.size())
    } else if direction < 0 {
        let pos = skip_spacers_left(doc, head);
        if let Some(location) = token_before(doc, pos) {
            let start = location.pos;
            return if doc.node_before(start).is_some_and(|(_, seg)| seg.is_spacer()) {
                start - 1
            } else {
                start
            };
        }
        pos.saturating_sub(1)
    } else {
        head
    }
}

/// Shift+Arrow: move the head, never splitting a token or orphaning a spacer
pub fn extend_selection(doc: &Document, selection: Selection, direction: i32) -> Selection {
    Selection::new(selection.anchor, next_stop(doc, selection.head, direction))
}

#[cfg(test)]
mod tests {
    use super::*;
    use querybar_document::FilterToken;

    // hi|[k:is:ab]|yo
    // positions: "hi" 0..2, spacer 2..3, token 3..7, spacer 7..8, "yo" 8..10
    fn doc(immutable: bool) -> Document {
        Document::from_segments(vec![
            Segment::text("hi"),
            Segment::Spacer,
            FilterToken::new("t", "k", "is", "ab").immutable(immutable).into(),
            Segment::Spacer,
            Segment::text("yo"),
        ])
    }

    fn focus_of(action: Option<GuardAction>) -> (String, usize, EntryDirection) {
        match action {
            Some(GuardAction::Focus {
                token_id,
                cursor,
                direction,
                ..
            }) => (token_id, cursor, direction),
            other => panic!("expected focus, got {other:?}"),
        }
    }

    #[test]
    fn test_arrow_right_enters_from_left() {
        let doc = doc(false);
        assert_eq!(focus_of(enforce_selection_invariant(&doc, 2, 1)), ("t".to_string(), 0, EntryDirection::Left));
        assert_eq!(focus_of(enforce_selection_invariant(&doc, 3, 1)), ("t".to_string(), 0, EntryDirection::Left));
        assert_eq!(enforce_selection_invariant(&doc, 1, 1), None);
    }

    #[test]
    fn test_arrow_left_enters_from_right() {
        let doc = doc(false);
        assert_eq!(focus_of(enforce_selection_invariant(&doc, 8, -1)), ("t".to_string(), 2, EntryDirection::Right));
    }

    #[test]
    fn test_click_never_corrects() {
        assert_eq!(enforce_selection_invariant(&doc(false), 3, 0), None);
    }

    #[test]
    fn test_immutable_is_skipped() {
        let doc = doc(true);
        assert_eq!(enforce_selection_invariant(&doc, 2, 1), Some(GuardAction::Move(7)));
        assert_eq!(enforce_selection_invariant(&doc, 8, -1), Some(GuardAction::Move(3)));
    }

    #[test]
    fn test_cursor_inside_token() {
        let doc = doc(true);
        let inside = get_cursor_inside_token(&doc, 4).unwrap();
        assert_eq!((inside.from, inside.to, inside.immutable), (3, 7, true));
        assert!(get_cursor_inside_token(&doc, 3).is_none());
        assert!(get_cursor_inside_token(&doc, 7).is_none());

        assert_eq!(resolve_cursor_inside_token(&doc, 4), Some(GuardAction::Move(3)));
        assert_eq!(resolve_cursor_inside_token(&doc, 6), Some(GuardAction::Move(7)));
    }

    #[test]
    fn test_mutable_inside_enters_closer_side() {
        let doc = doc(false);
        assert_eq!(focus_of(resolve_cursor_inside_token(&doc, 6)), ("t".to_string(), 2, EntryDirection::Right));
    }

    #[test]
    fn test_collapse_on_immutable_selects_token() {
        let doc = doc(true);
        let action = collapse_range(&doc, Selection::new(0, 3), Selection::cursor(3));
        assert_eq!(action, Some(GuardAction::Select(Selection::new(3, 7))));

        let mutable = self::doc(false);
        let action = collapse_range(&mutable, Selection::new(8, 10), Selection::cursor(7));
        assert_eq!(focus_of(action), ("t".to_string(), 2, EntryDirection::Right));

        assert_eq!(collapse_range(&mutable, Selection::cursor(1), Selection::cursor(3)), None);
    }

    #[test]
    fn test_extend_selection_covers_token_and_spacer() {
        let doc = doc(false);
        let sel = extend_selection(&doc, Selection::cursor(2), 1);
        assert_eq!((sel.anchor, sel.head), (2, 8));

        let sel = extend_selection(&doc, sel, 1);
        assert_eq!(sel.head, 9);

        let back = extend_selection(&doc, Selection::cursor(8), -1);
        assert_eq!(back.head, 2);
        assert_eq!(extend_selection(&doc, Selection::cursor(1), -1).head, 0);
    }
}
