//! Round-trip properties between the parser and the serializer

use proptest::prelude::*;
use querybar_document::{
    is_well_formed, parse, serialize, FreeTextMode, IdGenerator, ParseOptions, Snapshot,
};

fn parse_with_seed(input: &str) -> querybar_document::Document {
    let mut ids = IdGenerator::from_seed("rt".to_string());
    parse(input, &ParseOptions::new(':'), &mut ids)
}

#[test]
fn test_scenario_two_filters() {
    let input = "status:is:active priority:is:high";
    let doc = parse_with_seed(input);

    let snapshot = Snapshot::from_document(&doc, ':');
    let keys: Vec<String> = snapshot
        .filters()
        .map(|seg| match seg {
            querybar_document::SnapshotSegment::Filter {
                key,
                operator,
                value,
                ..
            } => format!("{key} {operator} {value}"),
            _ => unreachable!(),
        })
        .collect();

    assert_eq!(keys, vec!["status is active", "priority is high"]);
    assert_eq!(snapshot.text, input);
}

fn word() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z]{1,6}",
        "[a-z]{1,5}:(is|not):[a-z0-9]{0,5}",
        "[a-z]{1,5}:is:\"[a-z ]{1,6}\"",
    ]
}

fn query() -> impl Strategy<Value = String> {
    (
        prop::collection::vec((word(), " {1,3}"), 0..6),
        " {0,2}",
    )
        .prop_map(|(parts, lead)| {
            let mut out = lead;
            for (w, gap) in parts {
                out.push_str(&w);
                out.push_str(&gap);
            }
            out
        })
}

proptest! {
    #[test]
    fn parse_output_is_well_formed(input in query()) {
        let doc = parse_with_seed(&input);
        prop_assert!(is_well_formed(&doc), "doc: {}", doc.debug_string());
    }

    #[test]
    fn serialize_parse_serialize_is_stable(input in query()) {
        let first = serialize(&parse_with_seed(&input), ':');
        let second = serialize(&parse_with_seed(&first), ':');
        prop_assert_eq!(first, second);
    }

    #[test]
    fn parse_serialize_preserves_snapshot(input in query()) {
        let doc = parse_with_seed(&input);
        let reparsed = parse_with_seed(&serialize(&doc, ':'));
        prop_assert_eq!(
            Snapshot::from_document(&doc, ':'),
            Snapshot::from_document(&reparsed, ':')
        );
    }

    #[test]
    fn tokenize_mode_round_trips(words in prop::collection::vec("[a-z]{1,4}", 1..5)) {
        let input = words.join(" ");
        let options = ParseOptions::new(':').with_mode(FreeTextMode::Tokenize);
        let doc = parse(&input, &options, &mut IdGenerator::default());
        prop_assert_eq!(doc.token_count(), words.len());
        prop_assert_eq!(serialize(&doc, ':'), input);
    }
}
