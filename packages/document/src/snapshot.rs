//! Externally visible, host-agnostic view of one document state.

use crate::document::Document;
use crate::segment::Segment;
use crate::serializer::Serializer;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SnapshotSegment {
    #[serde(rename_all = "camelCase")]
    Filter {
        id: String,
        key: String,
        operator: String,
        value: String,
        invalid: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        invalid_reason: Option<String>,
    },
    FreeText {
        id: String,
        value: String,
        quoted: bool,
    },
    Plaintext {
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub segments: Vec<SnapshotSegment>,
    pub text: String,
}

impl Snapshot {
    /// Spacers are structural and do not appear in the snapshot
    pub fn from_document(doc: &Document, delimiter: char) -> Self {
        let segments = doc
            .segments()
            .iter()
            .filter_map(|seg| match seg {
                Segment::PlainText { value } => Some(SnapshotSegment::Plaintext {
                    value: value.clone(),
                }),
                Segment::Spacer => None,
                Segment::Filter(token) => Some(SnapshotSegment::Filter {
                    id: token.id.clone(),
                    key: token.key.clone(),
                    operator: token.operator.clone(),
                    value: token.value.clone(),
                    invalid: token.invalid,
                    invalid_reason: token.invalid_reason.clone(),
                }),
                Segment::FreeText(token) => Some(SnapshotSegment::FreeText {
                    id: token.id.clone(),
                    value: token.value.clone(),
                    quoted: token.quoted,
                }),
            })
            .collect();

        Self {
            segments,
            text: Serializer::new(delimiter).serialize(doc),
        }
    }

    pub fn filters(&self) -> impl Iterator<Item = &SnapshotSegment> {
        self.segments
            .iter()
            .filter(|seg| matches!(seg, SnapshotSegment::Filter { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id_generator::IdGenerator;
    use crate::parser::{parse, ParseOptions};

    #[test]
    fn test_snapshot_shape() {
        let doc = parse(
            "hello status:is:active",
            &ParseOptions::new(':'),
            &mut IdGenerator::default(),
        );
        let snapshot = Snapshot::from_document(&doc, ':');

        assert_eq!(snapshot.text, "hello status:is:active");
        assert_eq!(snapshot.segments.len(), 2);
        assert_eq!(snapshot.filters().count(), 1);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["segments"][0]["type"], "plaintext");
        assert_eq!(json["segments"][1]["type"], "filter");
    }
}
