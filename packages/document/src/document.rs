//! # Document
//!
//! Ordered sequence of segments inside a single container.
//!
//! Positions are derived, never stored: a segment's start is the sum of the
//! sizes of everything before it. Tokens are identified by their stable `id`
//! and their position is re-resolved whenever it is needed.

use crate::error::{DocumentError, DocumentResult};
use crate::segment::Segment;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    segments: Vec<Segment>,
}

/// A position resolved against a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPos {
    /// Index of the segment containing the position (`len` at the very end)
    pub index: usize,

    /// Start position of that segment
    pub start: usize,

    /// Offset of the position inside the segment
    pub offset: usize,
}

/// A token located in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLocation {
    pub index: usize,
    pub pos: usize,
    pub size: usize,
}

impl TokenLocation {
    pub fn end(&self) -> usize {
        self.pos + self.size
    }

    /// Whether `pos` lies strictly between the token's boundaries
    pub fn contains_strictly(&self, pos: usize) -> bool {
        self.pos < pos && pos < self.end()
    }
}

/// What a replace actually did after expanding over partially covered tokens
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    pub from: usize,
    pub to: usize,
    pub inserted: usize,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Segment>) -> Self {
        let segments = segments
            .into_iter()
            .filter(|seg| seg.size() > 0)
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total number of positions in the document
    pub fn size(&self) -> usize {
        self.segments.iter().map(Segment::size).sum()
    }

    pub fn get(&self, index: usize) -> Option<&Segment> {
        self.segments.get(index)
    }

    /// Iterate `(start position, segment)` pairs
    pub fn positioned(&self) -> impl Iterator<Item = (usize, &Segment)> + '_ {
        self.segments.iter().scan(0usize, |pos, seg| {
            let start = *pos;
            *pos += seg.size();
            Some((start, seg))
        })
    }

    /// Start position of the segment at `index`
    pub fn segment_start(&self, index: usize) -> usize {
        self.segments.iter().take(index).map(Segment::size).sum()
    }

    pub fn resolve(&self, pos: usize) -> DocumentResult<ResolvedPos> {
        let mut start = 0;
        for (index, seg) in self.segments.iter().enumerate() {
            let end = start + seg.size();
            if pos < end {
                return Ok(ResolvedPos {
                    index,
                    start,
                    offset: pos - start,
                });
            }
            start = end;
        }

        if pos == start {
            Ok(ResolvedPos {
                index: self.segments.len(),
                start,
                offset: 0,
            })
        } else {
            Err(DocumentError::out_of_range(pos, start))
        }
    }

    /// Segment starting exactly at `pos`
    pub fn node_after(&self, pos: usize) -> Option<(usize, &Segment)> {
        let resolved = self.resolve(pos).ok()?;
        if resolved.offset != 0 {
            return None;
        }
        self.segments
            .get(resolved.index)
            .map(|seg| (resolved.index, seg))
    }

    /// Segment ending exactly at `pos`
    pub fn node_before(&self, pos: usize) -> Option<(usize, &Segment)> {
        let resolved = self.resolve(pos).ok()?;
        if resolved.offset != 0 || resolved.index == 0 {
            return None;
        }
        let index = resolved.index - 1;
        self.segments.get(index).map(|seg| (index, seg))
    }

    /// Token whose span starts exactly at `pos`
    pub fn token_at(&self, pos: usize) -> Option<TokenLocation> {
        let (index, seg) = self.node_after(pos)?;
        seg.is_token().then(|| TokenLocation {
            index,
            pos,
            size: seg.size(),
        })
    }

    /// Token whose span strictly contains `pos`
    pub fn token_containing(&self, pos: usize) -> Option<TokenLocation> {
        let resolved = self.resolve(pos).ok()?;
        let seg = self.segments.get(resolved.index)?;
        (seg.is_token() && resolved.offset > 0).then(|| TokenLocation {
            index: resolved.index,
            pos: resolved.start,
            size: seg.size(),
        })
    }

    pub fn find_token(&self, id: &str) -> Option<TokenLocation> {
        self.positioned()
            .enumerate()
            .find(|(_, (_, seg))| seg.token_id() == Some(id))
            .map(|(index, (pos, seg))| TokenLocation {
                index,
                pos,
                size: seg.size(),
            })
    }

    pub fn token(&self, id: &str) -> Option<&Segment> {
        self.segments.iter().find(|seg| seg.token_id() == Some(id))
    }

    /// Iterate tokens with their locations, in document order
    pub fn tokens(&self) -> impl Iterator<Item = (TokenLocation, &Segment)> + '_ {
        self.positioned()
            .enumerate()
            .filter(|(_, (_, seg))| seg.is_token())
            .map(|(index, (pos, seg))| {
                (
                    TokenLocation {
                        index,
                        pos,
                        size: seg.size(),
                    },
                    seg,
                )
            })
    }

    pub fn token_count(&self) -> usize {
        self.segments.iter().filter(|seg| seg.is_token()).count()
    }

    pub fn spacer_count(&self) -> usize {
        self.segments.iter().filter(|seg| seg.is_spacer()).count()
    }

    /// Replace the token with the given id, returning its old span
    pub fn set_token(&mut self, id: &str, token: Segment) -> DocumentResult<(usize, usize)> {
        if !token.is_token() {
            return Err(DocumentError::NotAToken(id.to_string()));
        }
        let location = self
            .find_token(id)
            .ok_or_else(|| DocumentError::TokenNotFound(id.to_string()))?;
        self.segments[location.index] = token;
        Ok((location.pos, location.size))
    }

    /// Replace `from..to` with `content`.
    ///
    /// A range that partially covers a token is widened to the whole token.
    /// When both the removed and the inserted content are plain text, the
    /// text pieces around the seam are merged into a single run.
    pub fn replace(
        &mut self,
        from: usize,
        to: usize,
        content: Vec<Segment>,
    ) -> DocumentResult<ReplaceOutcome> {
        let size = self.size();
        if from > to {
            return Err(DocumentError::invalid_range(from, to));
        }
        if to > size {
            return Err(DocumentError::out_of_range(to, size));
        }

        let from = self.token_containing(from).map_or(from, |t| t.pos);
        let to = self.token_containing(to).map_or(to, |t| t.end());

        let mut before = Vec::new();
        let mut removed = Vec::new();
        let mut after = Vec::new();

        for (start, seg) in self.positioned() {
            let end = start + seg.size();
            if end <= from {
                before.push(seg.clone());
            } else if start >= to {
                after.push(seg.clone());
            } else if let Segment::PlainText { value } = seg {
                let chars: Vec<char> = value.chars().collect();
                let cut_from = from.saturating_sub(start).min(chars.len());
                let cut_to = to.saturating_sub(start).min(chars.len());
                if cut_from > 0 {
                    before.push(Segment::text(chars[..cut_from].iter().collect::<String>()));
                }
                if cut_to > cut_from {
                    removed.push(Segment::text(
                        chars[cut_from..cut_to].iter().collect::<String>(),
                    ));
                }
                if cut_to < chars.len() {
                    after.push(Segment::text(chars[cut_to..].iter().collect::<String>()));
                }
            } else {
                removed.push(seg.clone());
            }
        }

        let content: Vec<Segment> = content.into_iter().filter(|s| s.size() > 0).collect();
        let inserted = content.iter().map(Segment::size).sum();
        let pure_text = removed.iter().all(Segment::is_text) && content.iter().all(Segment::is_text);

        let segments = if pure_text {
            let mut merged = String::new();
            let mut head = before;
            let mut tail = after;
            if let Some(Segment::PlainText { value }) = head.last() {
                merged.push_str(value);
                head.pop();
            }
            for seg in &content {
                if let Some(text) = seg.as_text() {
                    merged.push_str(text);
                }
            }
            if let Some(Segment::PlainText { value }) = tail.first() {
                merged.push_str(value);
                tail.remove(0);
            }
            if !merged.is_empty() {
                head.push(Segment::text(merged));
            }
            head.extend(tail);
            head
        } else {
            let mut joined = before;
            joined.extend(content);
            joined.extend(after);
            joined
        };

        self.segments = segments.into_iter().filter(|s| s.size() > 0).collect();

        Ok(ReplaceOutcome { from, to, inserted })
    }

    /// Plain text with spacers and tokens elided, for debugging and tests
    pub fn debug_string(&self) -> String {
        let mut out = String::new();
        for seg in &self.segments {
            match seg {
                Segment::PlainText { value } => out.push_str(value),
                Segment::Spacer => out.push('|'),
                Segment::Filter(token) => {
                    out.push('[');
                    out.push_str(&token.key);
                    out.push(':');
                    out.push_str(&token.operator);
                    out.push(':');
                    out.push_str(&token.value);
                    out.push(']');
                }
                Segment::FreeText(token) => {
                    out.push('[');
                    out.push_str(&token.value);
                    out.push(']');
                }
            }
        }
        out
    }
}
