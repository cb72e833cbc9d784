use querybar_document::{
    is_well_formed, parse, serialize, Document, FieldDefinition, FieldRegistry, FilterToken, IdGenerator, InputKind,
    ParseOptions, Segment, Transaction,
};
use querybar_validation::{
    CustomRule, RuleRegistry, RuleSpec, Unique, UniqueBy, UniqueStrategy, ValidationEngine, ValidationInput,
    Violation,
};

fn parse_doc(input: &str) -> Document {
    parse(input, &ParseOptions::new(':'), &mut IdGenerator::from_seed("it".to_string()))
}

fn with_token(doc: &Document, token: FilterToken) -> Document {
    let mut tr = Transaction::new(doc);
    tr.insert(doc.size(), vec![Segment::Spacer, token.into(), Segment::Spacer])
        .unwrap();
    tr.into_doc()
}

fn final_doc(engine: &ValidationEngine, input: &ValidationInput<'_>, fields: &FieldRegistry) -> Document {
    let outcome = engine.run(input, fields).unwrap();
    outcome.doc().cloned().unwrap_or_else(|| input.doc.clone())
}

#[test]
fn test_unique_key_mark_and_reject() {
    let before = parse_doc("status:is:active");
    let after = with_token(&before, FilterToken::new("dup", "status", "is", "closed"));
    let fields = FieldRegistry::default();

    let marking = ValidationEngine::new(RuleRegistry::new().with_rule(Unique::rule(UniqueBy::Key)));
    let marked = final_doc(&marking, &ValidationInput::changed(&before, &after), &fields);
    assert_eq!(marked.token_count(), 2);
    assert!(marked.token("dup").unwrap().is_invalid());

    let rejecting = ValidationEngine::new(
        RuleRegistry::new().with_rule(Unique::rule(UniqueBy::Key).strategy(UniqueStrategy::Reject)),
    );
    let rejected = final_doc(&rejecting, &ValidationInput::changed(&before, &after), &fields);
    assert_eq!(serialize(&rejected, ':'), "status:is:active");
    assert!(is_well_formed(&rejected));
}

#[test]
fn test_no_premature_deletion_while_typing() {
    let engine = ValidationEngine::new(
        RuleRegistry::from_specs(&[RuleSpec::RequirePattern {
            key: Some("status".to_string()),
            pattern: "^active$".to_string(),
            strategy: querybar_validation::MarkOrReject::Reject,
            message: None,
        }])
        .unwrap(),
    );
    let fields = FieldRegistry::default();
    let mut doc = with_token(&parse_doc(""), FilterToken::new("t", "status", "is", "a"));

    for value in ["ac", "act", "acti", "activ"] {
        let mut tr = Transaction::new(&doc).with_input(InputKind::Typing);
        tr.update_token("t", |seg| seg.set_token_value(value)).unwrap();
        let next = tr.into_doc();
        let input = ValidationInput {
            input: InputKind::Typing,
            focused_id: Some("t"),
            ..ValidationInput::changed(&doc, &next)
        };
        let outcome = engine.run(&input, &fields).unwrap();
        assert!(outcome.deleted_token_ids.is_empty(), "deleted while typing {value:?}");
        doc = outcome.doc().cloned().unwrap_or(next);
    }
    assert!(doc.token("t").unwrap().is_invalid());

    // blurring confirms the value
    let input = ValidationInput {
        input: InputKind::Typing,
        blurred_id: Some("t"),
        ..ValidationInput::changed(&doc, &doc)
    };
    let outcome = engine.run(&input, &fields).unwrap();
    assert_eq!(outcome.deleted_token_ids, vec!["t".to_string()]);
}

#[test]
fn test_deleting_many_tokens_keeps_spacers_consistent() {
    let engine = ValidationEngine::default();
    let doc = parse_doc("a:is: b:is: c:is:1 d:is: text e:is:");
    let out = final_doc(&engine, &ValidationInput::forced(&doc), &FieldRegistry::default());

    assert_eq!(out.token_count(), 1);
    assert_eq!(out.spacer_count(), 2);
    assert!(is_well_formed(&out));
    assert_eq!(serialize(&out, ':'), "c:is:1 text");
}

#[test]
fn test_field_override_disables_rule_for_one_field() {
    let engine = ValidationEngine::new(RuleRegistry::new().with_rule(Unique::rule(UniqueBy::Key)));
    let fields = FieldRegistry::new(vec![FieldDefinition::new("tag").disable_rule("unique")]);
    let doc = parse_doc("tag:is:a tag:is:b status:is:x status:is:y");

    let outcome = engine.run(&ValidationInput::forced(&doc), &fields).unwrap();
    assert_eq!(outcome.violations.len(), 1);
    assert_eq!(outcome.violations[0].targets[0].pos, doc.tokens().nth(3).unwrap().0.pos);
}

#[test]
fn test_replace_existing_then_revalidate() {
    let engine = ValidationEngine::new(
        RuleRegistry::new()
            .with_rule(Unique::rule(UniqueBy::Key).strategy(UniqueStrategy::Replace))
            .with_rule(CustomRule::new("no-b", |ctx| {
                Ok(ctx
                    .filters()
                    .filter(|t| t.value == "b")
                    .map(|t| Violation::mark("no-b", "b is discouraged").with_target(&t.id, t.pos))
                    .collect())
            })),
    );
    let before = parse_doc("status:is:a");
    let after = with_token(&before, FilterToken::new("new", "status", "is", "b"));
    let outcome = engine
        .run(&ValidationInput::changed(&before, &after), &FieldRegistry::default())
        .unwrap();

    assert_eq!(outcome.deleted_token_ids.len(), 1);
    let doc = outcome.doc().unwrap();
    assert_eq!(serialize(doc, ':'), "status:is:b");
    assert_eq!(doc.token("new").unwrap().invalid_reason(), Some("b is discouraged"));
    // the surviving token sits where the deleted one was
    assert_eq!(outcome.violations[0].targets[0].pos, 1);
}
