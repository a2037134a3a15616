//! Normalization throughput over wide documents
//!
//! Each iteration decodes a fresh graph so every tier sees absent containers.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use nilsafe_core::{normalize, wire, SchemaDocument, Tier, Type, TypeRegistry, Value};
use serde_json::json;

const SCHEMA: &str = r#"{
    "root": "Response",
    "records": [
        { "name": "Response", "fields": [
            { "name": "content", "type": "Array<Content>" },
            { "name": "structured", "type": "Map<String, Any>" }
        ] },
        { "name": "Content", "fields": [
            { "name": "text", "type": "String" },
            { "name": "annotations", "type": "Array<String>" },
            { "name": "data", "type": "Map<String, Array<Integer>>" }
        ] }
    ]
}"#;

fn registry() -> TypeRegistry {
    SchemaDocument::from_json(SCHEMA)
        .and_then(SchemaDocument::into_registry)
        .expect("bench schema is valid")
}

fn document(width: usize) -> serde_json::Value {
    let content: Vec<_> = (0..width)
        .map(|i| {
            json!({
                "text": format!("item {i}"),
                "annotations": if i % 2 == 0 { json!(null) } else { json!(["a", "b"]) },
                "data": { "x": null, "y": [i] },
            })
        })
        .collect();
    json!({ "content": content, "structured": { "rows": [1, 2, 3], "none": null } })
}

fn bench_tiers(c: &mut Criterion) {
    let registry = registry();
    let mut group = c.benchmark_group("normalize");

    for width in [10usize, 100, 1_000] {
        let input = document(width);
        for tier in Tier::ALL {
            group.bench_function(BenchmarkId::new(tier.name(), width), |b| {
                b.iter_batched(
                    || {
                        let record = wire::decode(&input, &Type::record("Response"), &registry)
                            .expect("bench document decodes");
                        Value::reference(record)
                    },
                    |mut root| {
                        let report = normalize(&mut root, tier).expect("normalization succeeds");
                        black_box((root, report));
                    },
                    BatchSize::SmallInput,
                );
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_tiers);
criterion_main!(benches);
