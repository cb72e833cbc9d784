use querybar_document::{Document, Segment, Snapshot};
use serde::{Deserialize, Serialize};

/// A token as seen by collaborators once it is no longer being edited
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommittedToken {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<String>,
    pub value: String,
}

impl CommittedToken {
    fn from_segment(seg: &Segment) -> Option<Self> {
        match seg {
            Segment::Filter(token) => Some(Self {
                id: token.id.clone(),
                key: Some(token.key.clone()),
                operator: Some(token.operator.clone()),
                value: token.value.clone(),
            }),
            Segment::FreeText(token) => Some(Self {
                id: token.id.clone(),
                key: None,
                operator: None,
                value: token.value.clone(),
            }),
            _ => None,
        }
    }
}

/// Tokens in document order. The token being edited is reported as it was
/// last committed (`previous`), or left out if it never was.
pub fn committed_tokens(doc: &Document, focused_id: Option<&str>, previous: &[CommittedToken]) -> Vec<CommittedToken> {
    doc.tokens()
        .filter_map(|(_, seg)| {
            if seg.token_id().is_some() && seg.token_id() == focused_id {
                previous.iter().find(|token| Some(token.id.as_str()) == focused_id).cloned()
            } else {
                CommittedToken::from_segment(seg)
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum EditorEvent {
    /// A validated, repaired document state
    Change(Snapshot),
    Submit(Snapshot),
    TokenSetChanged(Vec<CommittedToken>),
    Focus,
    Blur,
}

#[cfg(test)]
mod tests {
    use super::*;
    use querybar_document::{FilterToken, FreeTextToken};

    #[test]
    fn test_focused_token_keeps_committed_value() {
        let doc = Document::from_segments(vec![
            Segment::Spacer,
            FilterToken::new("a", "status", "is", "open").into(),
            Segment::Spacer,
            FreeTextToken::new("b", "hello", false).into(),
            Segment::Spacer,
        ]);

        let all = committed_tokens(&doc, None, &[]);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].key.as_deref(), Some("status"));
        assert_eq!(all[1].key, None);

        let committed = committed_tokens(&doc, Some("a"), &[]);
        assert_eq!(committed.len(), 1);
        assert_eq!(committed[0].id, "b");

        let earlier = CommittedToken {
            value: "opened".to_string(),
            ..all[0].clone()
        };
        let committed = committed_tokens(&doc, Some("a"), &[earlier]);
        assert_eq!(committed[0].value, "opened");
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(EditorEvent::Focus).unwrap();
        assert_eq!(json, serde_json::json!({ "type": "focus" }));
    }
}
