//! Lexer for query strings using logos
//!
//! The query grammar is tiny: whitespace, `"quoted"` strings with backslash
//! escapes, and bare runs. Adjacent bare and quoted lexemes form a word.

use logos::Logos;
use std::ops::Range;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lexeme {
    #[regex(r"[ \t\r\n\f]+")]
    Whitespace,

    #[regex(r#""([^"\\]|\\.)*""#)]
    Quoted,

    #[regex(r#"[^ \t\r\n\f"]+"#)]
    Bare,
}

/// A maximal run of non-whitespace lexemes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub range: Range<usize>,
    pub parts: Vec<(Lexeme, Range<usize>)>,
}

impl Word {
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.range.clone()]
    }

    /// The word is exactly one `"..."` lexeme
    pub fn is_single_quoted(&self) -> bool {
        matches!(self.parts.as_slice(), [(Lexeme::Quoted, _)])
    }
}

/// Lex `input` into `(lexeme, byte range)` pairs.
///
/// An unterminated quote is not an error: the stray `"` is lexed as a bare
/// run and lexing resumes right after it.
pub fn lex(input: &str) -> Vec<(Lexeme, Range<usize>)> {
    let mut out = Vec::new();
    let mut offset = 0;

    'outer: while offset < input.len() {
        let mut lexer = Lexeme::lexer(&input[offset..]);
        while let Some(result) = lexer.next() {
            let span = lexer.span();
            let range = offset + span.start..offset + span.end;
            match result {
                Ok(lexeme) => out.push((lexeme, range)),
                Err(()) => {
                    let width = input[range.start..]
                        .chars()
                        .next()
                        .map_or(1, char::len_utf8);
                    out.push((Lexeme::Bare, range.start..range.start + width));
                    offset = range.start + width;
                    continue 'outer;
                }
            }
        }
        break;
    }

    out
}

/// Group lexemes into words, dropping whitespace
pub fn words(input: &str) -> Vec<Word> {
    let mut words: Vec<Word> = Vec::new();
    let mut current: Option<Word> = None;

    for (lexeme, range) in lex(input) {
        if lexeme == Lexeme::Whitespace {
            words.extend(current.take());
            continue;
        }
        match current.as_mut() {
            Some(word) => {
                word.range.end = range.end;
                word.parts.push((lexeme, range));
            }
            None => {
                current = Some(Word {
                    range: range.clone(),
                    parts: vec![(lexeme, range)],
                });
            }
        }
    }
    words.extend(current);
    words
}

pub fn unescape(inner: &str) -> String {
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Strip the surrounding quotes of a quoted lexeme and unescape it
pub fn unquote(quoted: &str) -> String {
    let inner = quoted
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(quoted);
    unescape(inner)
}

pub fn quote(value: &str) -> String {
    format!("\"{}\"", escape(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_words_and_quotes() {
        let input = r#"status:is:"in progress" hello"#;
        let words = words(input);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].text(input), r#"status:is:"in progress""#);
        assert_eq!(words[0].parts.len(), 2);
        assert_eq!(words[1].text(input), "hello");
    }

    #[test]
    fn test_unterminated_quote_is_bare() {
        let input = r#"say "hi there"#;
        let words = words(input);
        let texts: Vec<&str> = words.iter().map(|w| w.text(input)).collect();
        assert_eq!(texts, vec!["say", "\"hi", "there"]);
    }

    #[test]
    fn test_escape_round_trip() {
        let value = r#"a "b" \c"#;
        assert_eq!(unquote(&quote(value)), value);
    }

    #[test]
    fn test_single_quoted_word() {
        let input = r#""hello world""#;
        let words = words(input);
        assert_eq!(words.len(), 1);
        assert!(words[0].is_single_quoted());
    }
}
