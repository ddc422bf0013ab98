//! Benchmarks for denseid numbering operations

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use denseid::offsets::{build_offsets, BucketCount};
use denseid::partition::{PrefixBucketer, Repartitioner};

fn keys(count: usize) -> Vec<Vec<u8>> {
    let mut state = 0x2545_f491_4f6c_dd1du64;
    (0..count)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state.to_be_bytes()[..(state % 9) as usize].to_vec()
        })
        .collect()
}

fn bucketing_benchmarks(c: &mut Criterion) {
    let keys = keys(10_000);
    let bucketer = PrefixBucketer::new(1024).unwrap();
    let repartitioner = Repartitioner::new(1024, 1000);

    let mut group = c.benchmark_group("bucketing");
    group.throughput(Throughput::Elements(keys.len() as u64));

    group.bench_function("prefix_bucket", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(bucketer.bucket(black_box(key)));
            }
        })
    });

    group.bench_function("bucket_and_route", |b| {
        b.iter(|| {
            for key in &keys {
                black_box(repartitioner.worker_index(bucketer.bucket(black_box(key))));
            }
        })
    });

    group.finish();
}

fn offset_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("offsets");

    for bucket_count in [1024u32, 65_536] {
        let counts: Vec<BucketCount> = (0..bucket_count)
            .filter(|b| b % 3 != 0)
            .map(|b| BucketCount::new(b, (b as u64 % 17) + 1))
            .collect();

        group.bench_function(format!("build_offsets_{}", bucket_count), |b| {
            b.iter(|| build_offsets(bucket_count, black_box(counts.iter().copied())).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bucketing_benchmarks, offset_benchmarks);
criterion_main!(benches);
