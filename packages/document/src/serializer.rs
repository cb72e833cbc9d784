use crate::document::Document;
use crate::lexer;
use crate::segment::Segment;

/// Serializer converts a document back to a query string
///
/// Filters render as `key{d}operator{d}value`, quoting values that would
/// not survive re-lexing. Spacers render as one space when they sit between
/// two segments, and as nothing at either end of the document.
pub struct Serializer {
    delimiter: char,
}

impl Serializer {
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    pub fn serialize(&self, doc: &Document) -> String {
        let segments = doc.segments();
        let last = segments.len().saturating_sub(1);
        let mut output = String::new();

        for (index, seg) in segments.iter().enumerate() {
            match seg {
                Segment::PlainText { value } => output.push_str(value),
                Segment::Spacer => {
                    if index > 0 && index < last {
                        output.push(' ');
                    }
                }
                Segment::Filter(_) | Segment::FreeText(_) => {
                    self.serialize_token(seg, &mut output);
                }
            }
        }

        output
    }

    /// Serialize one token on its own
    pub fn serialize_token(&self, seg: &Segment, output: &mut String) {
        match seg {
            Segment::Filter(token) => {
                output.push_str(&token.key);
                output.push(self.delimiter);
                output.push_str(&token.operator);
                output.push(self.delimiter);
                if needs_quoting(&token.value) {
                    output.push_str(&lexer::quote(&token.value));
                } else {
                    output.push_str(&token.value);
                }
            }
            Segment::FreeText(token) => {
                if token.quoted || needs_quoting(&token.value) {
                    output.push_str(&lexer::quote(&token.value));
                } else {
                    output.push_str(&token.value);
                }
            }
            Segment::PlainText { .. } | Segment::Spacer => {}
        }
    }
}

/// Values with whitespace, quotes, or backslashes must be quoted to re-lex
pub fn needs_quoting(value: &str) -> bool {
    value
        .chars()
        .any(|c| c.is_whitespace() || c == '"' || c == '\\')
}

pub fn serialize(doc: &Document, delimiter: char) -> String {
    Serializer::new(delimiter).serialize(doc)
}
