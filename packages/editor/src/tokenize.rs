//! # Auto-tokenize
//!
//! Promotes words typed as plain text into tokens.
//!
//! | Mode       | Filter words | Other words                         |
//! |------------|--------------|-------------------------------------|
//! | `tokenize` | token        | free-text token                     |
//! | `plain`    | token        | stay plain text                     |
//! | `none`     | token        | stripped once tokens exist          |
//!
//! A word is complete once whitespace follows it or it is a closed quoted
//! string. Bulk input forces every word, including the trailing one.
//! Single-character typing in `tokenize` mode waits for a quiet period.

use querybar_document::lexer;
use querybar_document::parser::token_for_word;
use querybar_document::{
    classify_word, Document, DocumentResult, FieldRegistry, FreeTextMode, IdGenerator, ParseOptions, Segment,
    Transaction, WordKind,
};
use std::time::{Duration, Instant};
use tracing::trace;

/// A word inside a plain-text run, in document positions
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWord {
    pub from: usize,
    pub to: usize,
    pub kind: WordKind,
    pub complete: bool,
    pub space_before: bool,
    pub space_after: bool,
}

impl TextWord {
    /// The cursor is in the word or right at its end, i.e. still typing it
    pub fn is_under_cursor(&self, cursor: Option<usize>) -> bool {
        cursor.is_some_and(|pos| self.from < pos && pos <= self.to)
    }
}

pub fn text_words(doc: &Document, delimiter: char) -> Vec<TextWord> {
    let mut out = Vec::new();
    for (start, seg) in doc.positioned() {
        let Some(text) = seg.as_text() else {
            continue;
        };
        for word in lexer::words(text) {
            let head = &text[..word.range.start];
            let tail = &text[word.range.end..];
            let from = start + head.chars().count();
            let to = from + word.text(text).chars().count();
            let space_after = tail.chars().next().is_some_and(char::is_whitespace);
            out.push(TextWord {
                from,
                to,
                kind: classify_word(&word, text, delimiter),
                complete: space_after || word.is_single_quoted(),
                space_before: head.chars().next_back().is_some_and(char::is_whitespace),
                space_after,
            });
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct AutoTokenizer {
    mode: FreeTextMode,
    delimiter: char,
    debounce: Duration,
    deadline: Option<Instant>,
}

impl AutoTokenizer {
    pub fn new(mode: FreeTextMode, delimiter: char, debounce: Duration) -> Self {
        Self {
            mode,
            delimiter,
            debounce,
            deadline: None,
        }
    }

    pub fn mode(&self) -> FreeTextMode {
        self.mode
    }

    /// Whether typing one character should wait for the debounce
    pub fn debounces_typing(&self) -> bool {
        self.mode == FreeTextMode::Tokenize && !self.debounce.is_zero()
    }

    pub fn schedule(&mut self, now: Instant) {
        self.deadline = Some(now + self.debounce);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_pending(&self) -> bool {
        self.deadline.is_some()
    }

    /// Consume the pending deadline if it has passed
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Replace words with tokens. Without `force`, only complete words that
    /// are not under the cursor are promoted.
    pub fn tokenize(
        &self,
        tr: &mut Transaction,
        fields: &FieldRegistry,
        ids: &mut IdGenerator,
        cursor: Option<usize>,
        force: bool,
    ) -> DocumentResult<bool> {
        let options = ParseOptions::new(self.delimiter)
            .with_mode(self.mode)
            .with_fields(fields);

        let mut claimed = 0;
        let mut edits = Vec::new();
        for word in text_words(tr.doc(), self.delimiter) {
            if !force && (!word.complete || word.is_under_cursor(cursor)) {
                continue;
            }
            let (from, to) = (word.from, word.to);
            let Some(token) = token_for_word(word.kind, &options, ids) else {
                continue;
            };
            // absorb one whitespace char per side into the spacers
            let from = if word.space_before && from > claimed { from - 1 } else { from };
            let to = if word.space_after { to + 1 } else { to };
            claimed = to;
            edits.push((from, to, token));
        }

        let modified = !edits.is_empty();
        for (from, to, token) in edits.into_iter().rev() {
            trace!(from, to, "Tokenizing word");
            tr.replace(from, to, vec![Segment::Spacer, token, Segment::Spacer])?;
        }
        Ok(modified)
    }

    /// `none` mode: drop free text. With `all` every plain-text run goes
    /// (submit, blur); otherwise only complete free-text words, and only
    /// once the document has tokens.
    pub fn strip_free_text(&self, tr: &mut Transaction, cursor: Option<usize>, all: bool) -> DocumentResult<bool> {
        if self.mode != FreeTextMode::None {
            return Ok(false);
        }

        let ranges: Vec<(usize, usize)> = if all {
            tr.doc()
                .positioned()
                .filter(|(_, seg)| seg.is_text())
                .map(|(pos, seg)| (pos, pos + seg.size()))
                .collect()
        } else {
            if tr.doc().token_count() == 0 {
                return Ok(false);
            }
            text_words(tr.doc(), self.delimiter)
                .into_iter()
                .filter(|word| word.complete && !word.is_under_cursor(cursor))
                .filter(|word| matches!(word.kind, WordKind::FreeText { .. }))
                .map(|word| (word.from, if word.space_after { word.to + 1 } else { word.to }))
                .collect()
        };

        for (from, to) in ranges.iter().rev() {
            tr.delete(*from, *to)?;
        }
        Ok(!ranges.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer(mode: FreeTextMode) -> AutoTokenizer {
        AutoTokenizer::new(mode, ':', Duration::from_millis(50))
    }

    fn text_doc(text: &str) -> Document {
        Document::from_segments(vec![Segment::text(text)])
    }

    fn run(mode: FreeTextMode, text: &str, cursor: Option<usize>, force: bool) -> Document {
        let doc = text_doc(text);
        let mut tr = Transaction::new(&doc);
        tokenizer(mode)
            .tokenize(&mut tr, &FieldRegistry::default(), &mut IdGenerator::default(), cursor, force)
            .unwrap();
        tr.into_doc()
    }

    #[test]
    fn test_complete_filter_word_is_promoted_in_plain_mode() {
        let doc = run(FreeTextMode::Plain, "status:is:open hello wor", Some(24), false);
        assert_eq!(doc.debug_string(), "|[status:is:open]|hello wor");
    }

    #[test]
    fn test_word_under_cursor_waits() {
        let doc = run(FreeTextMode::Plain, "status:is:open", Some(14), false);
        assert_eq!(doc.token_count(), 0);

        let forced = run(FreeTextMode::Plain, "status:is:open", Some(14), true);
        assert_eq!(forced.token_count(), 1);
    }

    #[test]
    fn test_tokenize_mode_promotes_free_text() {
        let doc = run(FreeTextMode::Tokenize, "hello \"big world\"", None, false);
        assert_eq!(doc.token_count(), 2);
        let values: Vec<_> = doc.tokens().filter_map(|(_, seg)| seg.token_value()).collect();
        assert_eq!(values, vec!["hello", "big world"]);
    }

    #[test]
    fn test_adjacent_words_do_not_overlap() {
        let doc = run(FreeTextMode::Tokenize, "a b c", None, true);
        assert_eq!(doc.token_count(), 3);
        assert_eq!(doc.size(), 3 * 3 + 6);
    }

    #[test]
    fn test_strip_free_text_in_none_mode() {
        let tokenizer = tokenizer(FreeTextMode::None);
        let doc = Document::from_segments(vec![
            Segment::text("junk "),
            Segment::Spacer,
            querybar_document::FilterToken::new("t", "k", "is", "v").into(),
            Segment::Spacer,
            Segment::text("more typ"),
        ]);

        let mut tr = Transaction::new(&doc);
        assert!(tokenizer.strip_free_text(&mut tr, Some(doc.size()), false).unwrap());
        assert_eq!(tr.doc().debug_string(), "|[k:is:v]|typ");

        let mut tr = Transaction::new(&doc);
        tokenizer.strip_free_text(&mut tr, None, true).unwrap();
        assert_eq!(tr.doc().debug_string(), "|[k:is:v]|");
    }

    #[test]
    fn test_debounce_deadline() {
        let mut tokenizer = tokenizer(FreeTextMode::Tokenize);
        assert!(tokenizer.debounces_typing());
        let now = Instant::now();
        tokenizer.schedule(now);

        assert!(!tokenizer.take_due(now));
        assert!(tokenizer.take_due(now + Duration::from_millis(60)));
        assert!(!tokenizer.is_pending());
    }
}
