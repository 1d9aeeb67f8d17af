use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};

use echostats_core::Record;
use echostats_store::{RecordStore, SqliteStore};

fn reception(i: i64) -> Record {
    Record::new()
        .with("nonce", "bench")
        .with("packet_num", i)
        .with("total_expected", 1_000_000i64)
        .with("payload_len", 1400i64)
        .with("time", i)
        .with("address", "127.0.0.1:7777")
}

fn bench_insert_batch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let store = SqliteStore::open_memory().unwrap();

    let mut group = c.benchmark_group("insert_batch");
    for size in [1usize, 100, 1_000, 10_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || (0..size as i64).map(reception).collect::<Vec<_>>(),
                |batch| runtime.block_on(store.insert_batch(batch)).unwrap(),
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(benches, bench_insert_batch);
criterion_main!(benches);
