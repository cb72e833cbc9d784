use criterion::{black_box, criterion_group, criterion_main, Criterion};
use querybar_document::{FilterToken, Segment};
use querybar_editor::{repair_document, Document, EditorConfig, QueryEditor};

/// Tokens glued to text with no spacers at all, the worst case for repair
fn broken_doc(n: usize) -> Document {
    let segments = (0..n)
        .flat_map(|i| {
            [
                Segment::text(format!("word{i}")),
                Segment::from(FilterToken::new(format!("t{i}"), "field", "is", format!("v{i}"))),
                Segment::Spacer,
                Segment::Spacer,
            ]
        })
        .collect();
    Document::from_segments(segments)
}

fn bench_repair(c: &mut Criterion) {
    let doc = broken_doc(100);

    c.bench_function("repair_100_tokens", |b| b.iter(|| repair_document(black_box(&doc))));
}

fn bench_set_value(c: &mut Criterion) {
    let query = (0..100)
        .map(|i| format!("field{i}:is:value{i}"))
        .collect::<Vec<_>>()
        .join(" ");

    c.bench_function("set_value_100_filters", |b| {
        b.iter(|| {
            let mut editor = QueryEditor::new(EditorConfig::default()).unwrap();
            editor.set_value(black_box(&query)).unwrap();
            editor
        })
    });
}

criterion_group!(benches, bench_repair, bench_set_value);
criterion_main!(benches);
