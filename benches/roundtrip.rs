//! Benchmark: encode vs decode vs encode+decode round trip for a quota-usage
//! response carrying a few hundred accounts, against the demo catalog.

use adminmsg::{parse_schemas, Codec, MessageValue, SchemaRegistry, Value};
use criterion::{black_box, criterion_group, criterion_main, Criterion};

const NS: Option<&str> = Some("urn:mailadmin");

fn demo_codec() -> Codec {
    let mut registry = SchemaRegistry::new();
    registry
        .register_all(parse_schemas(include_str!("../demos/admin.msgs")).expect("parse"))
        .expect("register");
    Codec::new(registry).expect("codec")
}

fn quota_response(accounts: usize) -> MessageValue {
    let items: Vec<Value> = (0..accounts)
        .map(|i| {
            Value::Msg(
                MessageValue::new()
                    .with("name", Value::Str(format!("user{}@example.com", i)))
                    .with("id", Value::Str(format!("a-{}", i)))
                    .with("used", Value::Int((i as i64) * 1024))
                    .with("limit", Value::Int(10_485_760)),
            )
        })
        .collect();
    MessageValue::new()
        .with("more", Value::Bool(false))
        .with("searchTotal", Value::Int(accounts as i64))
        .with("account", Value::List(items))
}

fn bench_roundtrip(c: &mut Criterion) {
    let codec = demo_codec();
    let value = quota_response(250);
    let bytes = codec
        .encode("GetQuotaUsageResponse", NS, &value)
        .expect("encode");

    c.bench_function("encode_quota_250", |b| {
        b.iter(|| {
            codec
                .encode("GetQuotaUsageResponse", NS, black_box(&value))
                .expect("encode")
        })
    });

    c.bench_function("decode_quota_250", |b| {
        b.iter(|| {
            codec
                .decode("GetQuotaUsageResponse", NS, black_box(&bytes))
                .expect("decode")
        })
    });

    c.bench_function("roundtrip_quota_250", |b| {
        b.iter(|| {
            let encoded = codec
                .encode("GetQuotaUsageResponse", NS, black_box(&value))
                .expect("encode");
            codec
                .decode("GetQuotaUsageResponse", NS, &encoded)
                .expect("decode")
        })
    });
}

criterion_group!(benches, bench_roundtrip);
criterion_main!(benches);
