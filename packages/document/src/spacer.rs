//! # Spacer/Boundary Primitives
//!
//! Pure helpers that compute deletion ranges around tokens. A token is
//! removed together with the spacers that flank it; when that would glue two
//! words together, the range is replaced by a single space instead.

use crate::document::Document;
use crate::error::DocumentResult;
use crate::segment::Segment;
use crate::transaction::Transaction;
use tracing::trace;

/// A deletion range, possibly widened over adjacent spacers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpacerRange {
    pub from: usize,
    pub to: usize,
    /// Deleting the range would fuse two plain-text runs
    pub needs_space_separator: bool,
}

impl SpacerRange {
    pub fn is_empty(&self) -> bool {
        self.from >= self.to
    }
}

/// Widen a token span over one adjacent spacer on each side, if present.
///
/// Never fails: spacers that are absent (or positions that no longer
/// resolve) are simply not included.
pub fn expand_with_spacers(doc: &Document, pos: usize, size: usize) -> SpacerRange {
    let mut from = pos;
    let mut to = pos + size;

    if let Some((_, seg)) = doc.node_before(from) {
        if seg.is_spacer() {
            from -= 1;
        }
    }
    if let Some((_, seg)) = doc.node_after(to) {
        if seg.is_spacer() {
            to += 1;
        }
    }

    SpacerRange {
        from,
        to,
        needs_space_separator: check_boundary_needs_space(doc, from, to),
    }
}

/// Whether removing `from..to` would leave two plain-text runs touching with
/// no whitespace between them.
pub fn check_boundary_needs_space(doc: &Document, from: usize, to: usize) -> bool {
    let before = doc.node_before(from).map(|(_, seg)| seg);
    let after = doc.node_after(to).map(|(_, seg)| seg);

    match (before, after) {
        (Some(before @ Segment::PlainText { .. }), Some(after @ Segment::PlainText { .. })) => {
            !before.ends_with_whitespace() && !after.starts_with_whitespace()
        }
        _ => false,
    }
}

/// Delete the range, or replace it with one space when it separates words.
/// Returns whether the transaction changed.
pub fn apply_spacer_deletion(tr: &mut Transaction, range: &SpacerRange) -> DocumentResult<bool> {
    if range.is_empty() {
        return Ok(false);
    }
    trace!(from = range.from, to = range.to, separator = range.needs_space_separator, "Deleting spacer range");
    if range.needs_space_separator {
        tr.replace(range.from, range.to, vec![Segment::text(" ")])?;
    } else {
        tr.delete(range.from, range.to)?;
    }
    Ok(true)
}

/// Interval union over deletion ranges, sorted ascending.
///
/// The separator flag of each merged range is recomputed against the
/// document, because merging changes what ends up adjacent.
pub fn merge_overlapping_ranges(doc: &Document, mut ranges: Vec<SpacerRange>) -> Vec<SpacerRange> {
    ranges.retain(|range| !range.is_empty());
    ranges.sort_by_key(|range| (range.from, range.to));

    let mut merged: Vec<SpacerRange> = Vec::with_capacity(ranges.len());
    for range in ranges {
        match merged.last_mut() {
            Some(last) if range.from <= last.to => {
                last.to = last.to.max(range.to);
            }
            _ => merged.push(range),
        }
    }

    for range in &mut merged {
        keep_shared_spacer(doc, range);
        range.needs_space_separator = check_boundary_needs_space(doc, range.from, range.to);
    }
    merged
}

/// A spacer between two tokens is shared; when the range borders a token
/// that survives, one spacer at that edge stays behind for it.
fn keep_shared_spacer(doc: &Document, range: &mut SpacerRange) {
    fn is(seg: Option<(usize, &Segment)>, f: fn(&Segment) -> bool) -> bool {
        seg.is_some_and(|(_, seg)| f(seg))
    }

    if is(doc.node_before(range.from), Segment::is_token) && is(doc.node_after(range.from), Segment::is_spacer) {
        range.from += 1;
    } else if is(doc.node_after(range.to), Segment::is_token) && is(doc.node_before(range.to), Segment::is_spacer) {
        range.to -= 1;
    }
}

/// Apply merged ranges from the end backwards so earlier positions stay valid
pub fn apply_spacer_deletions(
    tr: &mut Transaction,
    ranges: Vec<SpacerRange>,
) -> DocumentResult<bool> {
    let mut merged = merge_overlapping_ranges(tr.doc(), ranges);
    merged.sort_by(|a, b| b.from.cmp(&a.from));

    let mut modified = false;
    for range in &merged {
        modified |= apply_spacer_deletion(tr, range)?;
    }
    Ok(modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::FilterToken;

    fn token(id: &str) -> Segment {
        Segment::from(FilterToken::new(id, "status", "is", "on"))
    }

    #[test]
    fn test_expand_between_words_needs_separator() {
        // hello|[t]|world
        let doc = Document::from_segments(vec![
            Segment::text("hello"),
            Segment::Spacer,
            token("t"),
            Segment::Spacer,
            Segment::text("world"),
        ]);
        let range = expand_with_spacers(&doc, 6, 4);
        assert_eq!((range.from, range.to), (5, 11));
        assert!(range.needs_space_separator);
    }

    #[test]
    fn test_expand_without_spacers() {
        let doc = Document::from_segments(vec![token("t")]);
        let range = expand_with_spacers(&doc, 0, 4);
        assert_eq!((range.from, range.to), (0, 4));
        assert!(!range.needs_space_separator);
    }

    #[test]
    fn test_whitespace_edge_needs_no_separator() {
        let doc = Document::from_segments(vec![
            Segment::text("hello "),
            Segment::Spacer,
            token("t"),
            Segment::Spacer,
            Segment::text("world"),
        ]);
        let range = expand_with_spacers(&doc, 7, 4);
        assert!(!range.needs_space_separator);
    }

    #[test]
    fn test_merge_recomputes_separator() {
        // a|[t1]|[t2]|b
        let doc = Document::from_segments(vec![
            Segment::text("a"),
            Segment::Spacer,
            token("t1"),
            Segment::Spacer,
            token("t2"),
            Segment::Spacer,
            Segment::text("b"),
        ]);
        let first = expand_with_spacers(&doc, 2, 4);
        let second = expand_with_spacers(&doc, 7, 4);
        assert!(!first.needs_space_separator);
        assert!(!second.needs_space_separator);

        let merged = merge_overlapping_ranges(&doc, vec![second, first]);
        assert_eq!(merged.len(), 1);
        assert_eq!((merged[0].from, merged[0].to), (1, 12));
        assert!(merged[0].needs_space_separator);
    }

    #[test]
    fn test_shared_spacer_survives() {
        // |[t1]|[t2]|  deleting t1 keeps the spacer in front of t2
        let doc = Document::from_segments(vec![
            Segment::Spacer,
            token("t1"),
            Segment::Spacer,
            token("t2"),
            Segment::Spacer,
        ]);
        let range = expand_with_spacers(&doc, 1, 4);
        assert_eq!((range.from, range.to), (0, 6));

        let mut tr = Transaction::new(&doc);
        assert!(apply_spacer_deletions(&mut tr, vec![range]).unwrap());
        assert_eq!(tr.doc().debug_string(), "|[status:is:on]|");
    }

    #[test]
    fn test_middle_token_leaves_one_spacer() {
        let doc = Document::from_segments(vec![
            Segment::Spacer,
            token("t1"),
            Segment::Spacer,
            token("t2"),
            Segment::Spacer,
            token("t3"),
            Segment::Spacer,
        ]);
        let t2 = doc.find_token("t2").unwrap();
        let mut tr = Transaction::new(&doc);
        apply_spacer_deletions(&mut tr, vec![expand_with_spacers(&doc, t2.pos, t2.size)]).unwrap();

        assert_eq!(tr.doc().token_count(), 2);
        assert_eq!(tr.doc().spacer_count(), 3);
    }

    #[test]
    fn test_apply_replaces_with_space() {
        let doc = Document::from_segments(vec![
            Segment::text("hello"),
            Segment::Spacer,
            token("t"),
            Segment::Spacer,
            Segment::text("world"),
        ]);
        let mut tr = Transaction::new(&doc);
        let range = expand_with_spacers(&doc, 6, 4);
        assert!(apply_spacer_deletion(&mut tr, &range).unwrap());

        let text: String = tr
            .doc()
            .segments()
            .iter()
            .filter_map(|seg| seg.as_text())
            .collect();
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_empty_range_is_noop() {
        let doc = Document::from_segments(vec![Segment::text("x")]);
        let mut tr = Transaction::new(&doc);
        let range = SpacerRange {
            from: 1,
            to: 1,
            needs_space_separator: true,
        };
        assert!(!apply_spacer_deletion(&mut tr, &range).unwrap());
        assert!(!tr.doc_changed());
    }
}
