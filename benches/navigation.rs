#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use scribe::{Reader, ScribeObject, Writer};
use std::hint::black_box;

#[derive(ScribeObject, Clone, Debug)]
struct Sample {
    id: u64,
    energy: f64,
    hits: Vec<u32>,
}

fn generate_data(count: usize) -> Vec<Sample> {
    (0..count)
        .map(|i| Sample {
            id: i as u64,
            energy: i as f64 * 0.5,
            hits: vec![i as u32; i % 16],
        })
        .collect()
}

fn encode(samples: &[Sample], fixed: &[f64]) -> Vec<u8> {
    let mut w = Writer::new(Vec::new());
    w.write("samples", samples)
        .and_then(|w| w.write("fixed", fixed))
        .expect("write failed");
    w.close().expect("close failed")
}

// --- BENCHMARKS ---

fn bench_write(c: &mut Criterion) {
    let samples = generate_data(10_000);
    let fixed: Vec<f64> = (0..100_000).map(|i| i as f64).collect();

    let mut group = c.benchmark_group("Write");
    group.throughput(Throughput::Elements(samples.len() as u64));
    group.bench_function("encode_samples", |b| {
        b.iter(|| encode(black_box(&samples), black_box(&fixed)));
    });
    group.finish();
}

fn bench_read(c: &mut Criterion) {
    let samples = generate_data(10_000);
    let fixed: Vec<f64> = (0..100_000).map(|i| i as f64).collect();
    let reader = Reader::from_bytes(encode(&samples, &fixed)).expect("open failed");

    let mut group = c.benchmark_group("Read");

    group.bench_function("open_header", |b| {
        let bytes = encode(&samples[..10], &fixed[..10]);
        b.iter(|| Reader::from_bytes(black_box(bytes.clone())).expect("open failed"));
    });

    // Fixed-width elements: offset arithmetic only.
    group.bench_function("fixed_random_access", |b| {
        let arr = reader.get("fixed").expect("missing field");
        b.iter(|| {
            let v: f64 = arr.get(black_box(99_999usize)).and_then(|n| n.cast()).expect("read failed");
            black_box(v)
        });
    });

    // Variable-width elements: every earlier element is walked.
    for index in [10usize, 1_000, 9_999] {
        group.bench_with_input(BenchmarkId::new("variable_access", index), &index, |b, &i| {
            let arr = reader.get("samples").expect("missing field");
            b.iter(|| {
                let e: f64 = arr
                    .get(black_box(i))
                    .and_then(|n| n.get("energy"))
                    .and_then(|n| n.cast())
                    .expect("read failed");
                black_box(e)
            });
        });
    }

    group.throughput(Throughput::Elements(samples.len() as u64));
    group.bench_function("iterate_samples", |b| {
        let arr = reader.get("samples").expect("missing field");
        b.iter(|| {
            let mut total = 0.0f64;
            for node in arr.iter().expect("not iterable") {
                total += node
                    .and_then(|n| n.get("energy"))
                    .and_then(|n| n.cast::<f64>())
                    .expect("read failed");
            }
            black_box(total)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_write, bench_read);
criterion_main!(benches);
