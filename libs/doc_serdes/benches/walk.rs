#![allow(unused_crate_dependencies)]
use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use doc_serdes::key::Camel2SnakeCase;
use doc_serdes::{Codec, Document, SerDes, Signal, Value};

fn bench_walk(c: &mut Criterion) {
    let plain = SerDes::builder().build().expect("no codecs");
    let codecs = SerDes::builder()
        .key_transformer(Camel2SnakeCase::new())
        .codec(Codec::for_name("score").serialize(|_, v, _| {
            Ok(Signal::done_with(v.as_i64().unwrap_or_default() * 10))
        }))
        .codec(Codec::for_guard("$upper", |v, _| v.as_str().is_some()).serialize(|_, _, _| {
            Ok(Signal::next())
        }))
        .build()
        .expect("valid codecs");

    let doc = sample_doc(200);

    c.bench_function("serialize_plain", |b| {
        b.iter(|| plain.serialize_record(black_box(&doc)))
    });

    c.bench_function("serialize_codecs", |b| {
        b.iter(|| codecs.serialize_record(black_box(&doc)))
    });

    c.bench_function("serialize_codecs_in_place", |b| {
        b.iter_batched(
            || doc.clone(),
            |mut doc| codecs.serialize_record_mut(&mut doc).map(|_| doc),
            criterion::BatchSize::SmallInput,
        )
    });
}

fn sample_doc(items: i64) -> Value {
    let items = (0..items)
        .map(|i| {
            let item = [
                ("itemId", Value::Int(i)),
                ("displayName", Value::from(format!("item {i}"))),
                ("score", Value::Int(i % 7)),
                ("tags", Value::from(vec![Value::from("a"), Value::from("b")])),
            ];
            Value::from(item.into_iter().collect::<Document>())
        })
        .collect::<Vec<_>>();

    let root = [
        ("_id", Value::from("root")),
        ("createdAt", Value::Int(0)),
        ("items", Value::from(items)),
    ];
    Value::from(root.into_iter().collect::<Document>())
}

criterion_group!(benches, bench_walk);
criterion_main!(benches);
