//! # Query Parser
//!
//! Turns a query string into a repaired document.
//!
//! ```text
//! "hello status:is:active  world"
//!    │         │            │
//!    ▼         ▼            ▼
//! "hello" | [status:is:active] | " world"
//! ```
//!
//! One whitespace char on each inward side of a token is absorbed by its
//! spacer; a single whitespace char between two tokens becomes one shared
//! spacer. The serializer emits exactly those chars back.

use crate::document::Document;
use crate::field::FieldRegistry;
use crate::id_generator::IdGenerator;
use crate::lexer::{self, Lexeme, Word};
use crate::segment::{FilterToken, FreeTextToken, Segment};
use serde::{Deserialize, Serialize};

/// How free text (anything that is not a filter) is treated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FreeTextMode {
    /// Words become free-text tokens
    Tokenize,
    /// Free text stays plain text
    #[default]
    Plain,
    /// Free text is stripped once filters exist
    None,
}

#[derive(Debug, Clone)]
pub struct ParseOptions<'a> {
    pub delimiter: char,
    pub free_text_mode: FreeTextMode,
    pub fields: Option<&'a FieldRegistry>,
}

impl<'a> ParseOptions<'a> {
    pub fn new(delimiter: char) -> Self {
        Self {
            delimiter,
            free_text_mode: FreeTextMode::default(),
            fields: None,
        }
    }

    pub fn with_mode(mut self, mode: FreeTextMode) -> Self {
        self.free_text_mode = mode;
        self
    }

    pub fn with_fields(mut self, fields: &'a FieldRegistry) -> Self {
        self.fields = Some(fields);
        self
    }
}

/// Classification of a single word
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WordKind {
    Filter {
        key: String,
        operator: String,
        value: String,
    },
    FreeText {
        value: String,
        quoted: bool,
    },
}

/// Split a word on the delimiter (outside quotes) into `key op value`
pub fn classify_word(word: &Word, input: &str, delimiter: char) -> WordKind {
    let mut cuts = Vec::with_capacity(2);
    'parts: for (lexeme, range) in &word.parts {
        if *lexeme != Lexeme::Bare {
            continue;
        }
        for (offset, c) in input[range.clone()].char_indices() {
            if c == delimiter {
                cuts.push(range.start + offset);
                if cuts.len() == 2 {
                    break 'parts;
                }
            }
        }
    }

    if let [first, second] = cuts[..] {
        let width = delimiter.len_utf8();
        let key = &input[word.range.start..first];
        let operator = &input[first + width..second];
        let value_start = second + width;
        if !key.is_empty() && !operator.is_empty() {
            let raw = &input[value_start..word.range.end];
            let value_parts = word
                .parts
                .iter()
                .filter(|(_, range)| range.end > value_start)
                .map(|(lexeme, range)| (*lexeme, range.clone()))
                .collect::<Vec<_>>();
            let value = match value_parts.as_slice() {
                [(Lexeme::Quoted, range)] if range.start == value_start => lexer::unquote(raw),
                _ => raw.to_string(),
            };
            return WordKind::Filter {
                key: key.to_string(),
                operator: operator.to_string(),
                value,
            };
        }
    }

    if word.is_single_quoted() {
        WordKind::FreeText {
            value: lexer::unquote(word.text(input)),
            quoted: true,
        }
    } else {
        WordKind::FreeText {
            value: word.text(input).to_string(),
            quoted: false,
        }
    }
}

fn strip_one_leading_ws(s: &str) -> &str {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_whitespace() => chars.as_str(),
        _ => s,
    }
}

fn strip_one_trailing_ws(s: &str) -> &str {
    let mut chars = s.chars();
    match chars.next_back() {
        Some(c) if c.is_whitespace() => chars.as_str(),
        _ => s,
    }
}

fn push_text(segments: &mut Vec<Segment>, text: &str) {
    if !text.is_empty() {
        segments.push(Segment::text(text));
    }
}

/// Build the token segment for a classified word, if it becomes a token
pub fn token_for_word(
    kind: WordKind,
    options: &ParseOptions<'_>,
    ids: &mut IdGenerator,
) -> Option<Segment> {
    match kind {
        WordKind::Filter {
            key,
            operator,
            value,
        } => {
            let immutable = options.fields.is_some_and(|f| f.is_immutable(&key));
            Some(FilterToken::new(ids.new_id(), key, operator, value).immutable(immutable).into())
        }
        WordKind::FreeText { value, quoted } => match options.free_text_mode {
            FreeTextMode::Tokenize => Some(FreeTextToken::new(ids.new_id(), value, quoted).into()),
            FreeTextMode::Plain | FreeTextMode::None => None,
        },
    }
}

/// Parse a query string into segments that already satisfy the spacer
/// invariant.
pub fn parse_segments(input: &str, options: &ParseOptions<'_>, ids: &mut IdGenerator) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut cursor = 0;
    let mut after_token = false;

    for word in lexer::words(input) {
        let kind = classify_word(&word, input, options.delimiter);
        let Some(token) = token_for_word(kind, options, ids) else {
            continue;
        };

        let region = &input[cursor..word.range.start];
        if after_token {
            // previous token's trailing spacer absorbs one leading char
            let inner = strip_one_leading_ws(region);
            if !inner.is_empty() {
                push_text(&mut segments, strip_one_trailing_ws(inner));
                segments.push(Segment::Spacer);
            }
        } else {
            if !region.is_empty() {
                push_text(&mut segments, strip_one_trailing_ws(region));
            }
            segments.push(Segment::Spacer);
        }

        segments.push(token);
        segments.push(Segment::Spacer);
        cursor = word.range.end;
        after_token = true;
    }

    let tail = &input[cursor..];
    if after_token {
        push_text(&mut segments, strip_one_leading_ws(tail));
    } else {
        push_text(&mut segments, tail);
    }

    segments
}

pub fn parse(input: &str, options: &ParseOptions<'_>, ids: &mut IdGenerator) -> Document {
    Document::from_segments(parse_segments(input, options, ids))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invariants::is_well_formed;

    fn parse_plain(input: &str) -> Document {
        parse(input, &ParseOptions::new(':'), &mut IdGenerator::default())
    }

    #[test]
    fn test_parse_two_filters() {
        let doc = parse_plain("status:is:active priority:is:high");
        assert_eq!(doc.token_count(), 2);
        assert_eq!(doc.spacer_count(), 3);
        assert_eq!(
            doc.debug_string(),
            "|[status:is:active]|[priority:is:high]|"
        );
        assert!(is_well_formed(&doc));
    }

    #[test]
    fn test_parse_mixed_text() {
        let doc = parse_plain("hello status:is:active world");
        assert_eq!(doc.debug_string(), "hello|[status:is:active]|world");
    }

    #[test]
    fn test_parse_double_space_between_tokens() {
        let doc = parse_plain("a:is:1  b:is:2");
        assert_eq!(doc.debug_string(), "|[a:is:1]||[b:is:2]|");
        assert!(is_well_formed(&doc));
    }

    #[test]
    fn test_parse_quoted_value_and_extra_delimiters() {
        let doc = parse_plain(r#"title:is:"in progress" url:is:http://x"#);
        let values: Vec<&str> = doc.tokens().filter_map(|(_, t)| t.token_value()).collect();
        assert_eq!(values, vec!["in progress", "http://x"]);
    }

    #[test]
    fn test_incomplete_filter_stays_text() {
        let doc = parse_plain("status: :is:x");
        assert_eq!(doc.token_count(), 0);
        assert_eq!(doc.debug_string(), "status: :is:x");
    }

    #[test]
    fn test_tokenize_mode_wraps_free_text() {
        let options = ParseOptions::new(':').with_mode(FreeTextMode::Tokenize);
        let doc = parse(r#"foo "bar baz" k:is:v"#, &options, &mut IdGenerator::default());
        assert_eq!(doc.token_count(), 3);
        assert!(matches!(
            &doc.segments()[3],
            Segment::FreeText(token) if token.quoted && token.value == "bar baz"
        ));
    }

    #[test]
    fn test_immutable_fields_mark_tokens() {
        let fields = FieldRegistry::new(vec![
            crate::field::FieldDefinition::new("owner").immutable(true),
        ]);
        let options = ParseOptions::new(':').with_fields(&fields);
        let doc = parse("owner:is:me", &options, &mut IdGenerator::default());
        assert!(doc.segments()[1].is_immutable());
    }
}
