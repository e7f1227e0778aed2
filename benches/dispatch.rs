use criterion::{black_box, BatchSize, BenchmarkId, Criterion};
use criterion::{criterion_group, criterion_main};
use tempfile::tempdir;

use strata::{Row, RowDef, SplitTable, SplitTableConfig};

const OPS_PER_ITER: usize = 2_000;

fn row(i: usize) -> Row {
    let mut bytes = format!("{i:08}").into_bytes();
    bytes.extend_from_slice(b"payload!");
    Row::from_bytes(bytes)
}

fn bench_put(c: &mut Criterion) {
    let mut group = c.benchmark_group("put");
    for &partitions in &[1_usize, 4, 16] {
        group.bench_with_input(
            BenchmarkId::from_parameter(partitions),
            &partitions,
            |b, &partitions| {
                b.iter_batched(
                    || {
                        let dir = tempdir().expect("tempdir");
                        let config = SplitTableConfig {
                            // Roughly OPS_PER_ITER rows spread over the
                            // requested partition count.
                            size_limit: (32 + 16 * OPS_PER_ITER / partitions) as u64,
                            ..Default::default()
                        };
                        let table =
                            SplitTable::open(dir.path(), "bench", RowDef::new(16, 8), config)
                                .expect("open table");
                        (dir, table)
                    },
                    |(_dir, table)| {
                        for i in 0..OPS_PER_ITER {
                            table.put(black_box(row(i))).expect("put");
                        }
                    },
                    BatchSize::LargeInput,
                );
            },
        );
    }
    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("get");
    for &partitions in &[1_usize, 4, 16] {
        group.bench_with_input(
            BenchmarkId::from_parameter(partitions),
            &partitions,
            |b, &partitions| {
                let dir = tempdir().expect("tempdir");
                let config = SplitTableConfig {
                    size_limit: (32 + 16 * OPS_PER_ITER / partitions) as u64,
                    ..Default::default()
                };
                let table = SplitTable::open(dir.path(), "bench", RowDef::new(16, 8), config)
                    .expect("open table");
                for i in 0..OPS_PER_ITER {
                    table.put(row(i)).expect("put");
                }

                b.iter(|| {
                    for i in (0..OPS_PER_ITER).step_by(7) {
                        let key = format!("{i:08}");
                        black_box(table.get(key.as_bytes(), false).expect("get"));
                    }
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_put, bench_get);
criterion_main!(benches);
