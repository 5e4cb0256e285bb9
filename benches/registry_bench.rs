//! Benchmarks for the portable registry and string helpers.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use winctl::registry::{RegistryPath, Value, ValueKind};
use winctl::string::{from_wide, to_multi_wide, to_wide, wide_to_bytes};

fn bench_path_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry_path_parse");

    for depth in [1, 4, 16].iter() {
        let path = format!(r"HKEY_LOCAL_MACHINE\{}", vec!["Segment"; *depth].join(r"\"));
        group.bench_with_input(BenchmarkId::from_parameter(depth), &path, |b, path| {
            b.iter(|| RegistryPath::parse(black_box(path)))
        });
    }

    group.finish();
}

fn bench_value_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("value_decode");

    let dword = 42u32.to_le_bytes().to_vec();
    group.bench_function("dword", |b| b.iter(|| Value::decode(4, black_box(dword.clone()))));

    for size in [10, 1000].iter() {
        let text = wide_to_bytes(&to_wide(&"a".repeat(*size)));
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_with_input(BenchmarkId::new("string", size), &text, |b, text| {
            b.iter(|| Value::decode(1, black_box(text.clone())))
        });
    }

    let items: Vec<String> = (0..32).map(|i| format!("entry-{i}")).collect();
    let multi = wide_to_bytes(&to_multi_wide(&items));
    group.bench_function("multi_string", |b| {
        b.iter(|| Value::decode(7, black_box(multi.clone())))
    });

    group.finish();
}

fn bench_parse_as(c: &mut Criterion) {
    c.bench_function("parse_as_binary", |b| {
        b.iter(|| Value::parse_as(ValueKind::Binary, black_box(&["de", "ad", "be", "ef"])))
    });
}

fn bench_wide_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("wide_roundtrip");

    for size in [10, 1000, 10000].iter() {
        let input = "a".repeat(*size);
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &input, |b, input| {
            b.iter(|| from_wide(&to_wide(black_box(input))))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_path_parse,
    bench_value_decode,
    bench_parse_as,
    bench_wide_roundtrip
);
criterion_main!(benches);
