//! Keyboard guard: keys whose meaning depends on a neighbouring token.

use crate::focus::{EntryDirection, FocusPolicy};
use crate::selection_guard::{skip_spacers_left, skip_spacers_right, token_before, GuardAction};
use querybar_document::{Document, FieldRegistry, Selection};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    ArrowLeft,
    ArrowRight,
    Backspace,
    Delete,
    Escape,
    Enter,
    Tab,
    Char(char),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self { key, shift: false }
    }

    pub fn with_shift(key: Key) -> Self {
        Self { key, shift: true }
    }

    /// Horizontal direction of an arrow key, 0 for everything else
    pub fn direction(&self) -> i32 {
        match self.key {
            Key::ArrowLeft => -1,
            Key::ArrowRight => 1,
            _ => 0,
        }
    }
}

impl From<Key> for KeyEvent {
    fn from(key: Key) -> Self {
        KeyEvent::new(key)
    }
}

/// Backspace/Delete at a collapsed cursor next to a token (spacers in
/// between are skipped). A mutable token is entered straight into its value
/// editor; an immutable one is selected so the next key removes it.
pub fn boundary_delete(doc: &Document, cursor: usize, key: Key) -> Option<GuardAction> {
    let (location, direction) = match key {
        Key::Backspace => (token_before(doc, skip_spacers_left(doc, cursor))?, EntryDirection::Right),
        Key::Delete => (doc.token_at(skip_spacers_right(doc, cursor))?, EntryDirection::Left),
        _ => return None,
    };
    let seg = doc.get(location.index)?;

    if seg.is_immutable() {
        return Some(GuardAction::Select(Selection::new(location.pos, location.end())));
    }

    let cursor = match direction {
        EntryDirection::Left => 0,
        EntryDirection::Right => seg.token_value().map_or(0, |value| value.chars().count()),
    };
    Some(GuardAction::Focus {
        token_id: seg.token_id()?.to_string(),
        cursor,
        direction,
        policy: FocusPolicy::Entry,
    })
}

/// A field key typed as plain text, about to become an empty token.
///
/// `from` includes one whitespace char before the word; the token's spacer
/// takes its place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColonTrigger {
    pub from: usize,
    pub to: usize,
    pub key: String,
}

/// Typing the delimiter right after a word naming a declared (mutable) field.
///
/// `cursor` is where the delimiter would be inserted.
pub fn detect_colon_trigger(
    doc: &Document,
    cursor: usize,
    typed: char,
    delimiter: char,
    fields: &FieldRegistry,
) -> Option<ColonTrigger> {
    if typed != delimiter {
        return None;
    }

    let (start, text) = doc
        .positioned()
        .find(|(start, seg)| seg.is_text() && *start < cursor && cursor <= start + seg.size())
        .and_then(|(start, seg)| Some((start, seg.as_text()?)))?;

    let offset = cursor - start;
    let before: String = text.chars().take(offset).collect();
    if text.chars().nth(offset).is_some_and(|c| !c.is_whitespace()) {
        return None;
    }

    let word = before.rsplit(char::is_whitespace).next()?;
    let field = fields.get(word)?;
    if field.immutable {
        return None;
    }

    let mut len = word.chars().count();
    if before.chars().rev().nth(len).is_some_and(char::is_whitespace) {
        len += 1;
    }
    Some(ColonTrigger {
        from: cursor - len,
        to: cursor,
        key: field.key.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use querybar_document::{FieldDefinition, FilterToken, Segment};

    fn doc(immutable: bool) -> Document {
        // ab|[k:is:xy]|cd
        Document::from_segments(vec![
            Segment::text("ab"),
            Segment::Spacer,
            FilterToken::new("t", "k", "is", "xy").immutable(immutable).into(),
            Segment::Spacer,
            Segment::text("cd"),
        ])
    }

    #[test]
    fn test_backspace_enters_from_right_with_entry_policy() {
        let action = boundary_delete(&doc(false), 8, Key::Backspace);
        assert_eq!(
            action,
            Some(GuardAction::Focus {
                token_id: "t".to_string(),
                cursor: 2,
                direction: EntryDirection::Right,
                policy: FocusPolicy::Entry,
            })
        );
    }

    #[test]
    fn test_delete_enters_from_left() {
        let action = boundary_delete(&doc(false), 2, Key::Delete);
        assert!(matches!(
            action,
            Some(GuardAction::Focus {
                cursor: 0,
                direction: EntryDirection::Left,
                ..
            })
        ));
        assert_eq!(boundary_delete(&doc(false), 1, Key::Delete), None);
    }

    #[test]
    fn test_immutable_token_is_selected() {
        assert_eq!(
            boundary_delete(&doc(true), 8, Key::Backspace),
            Some(GuardAction::Select(Selection::new(3, 7)))
        );
    }

    #[test]
    fn test_colon_trigger() {
        let fields = FieldRegistry::new(vec![
            FieldDefinition::new("status"),
            FieldDefinition::new("owner").immutable(true),
        ]);
        let doc = Document::from_segments(vec![Segment::text("find status")]);

        assert_eq!(
            detect_colon_trigger(&doc, 11, ':', ':', &fields),
            Some(ColonTrigger {
                from: 4,
                to: 11,
                key: "status".to_string(),
            })
        );
        assert_eq!(detect_colon_trigger(&doc, 11, '=', ':', &fields), None);
        assert_eq!(detect_colon_trigger(&doc, 10, ':', ':', &fields), None);

        let owner = Document::from_segments(vec![Segment::text("owner")]);
        assert_eq!(detect_colon_trigger(&owner, 5, ':', ':', &fields), None);
    }

    #[test]
    fn test_arrow_direction() {
        assert_eq!(KeyEvent::new(Key::ArrowLeft).direction(), -1);
        assert_eq!(KeyEvent::with_shift(Key::ArrowRight).direction(), 1);
        assert_eq!(KeyEvent::from(Key::Tab).direction(), 0);
    }
}
