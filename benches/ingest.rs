use criterion::{criterion_group, criterion_main, Criterion};
use dstream_grid::{Config, DenseRecord, Driver};
use rand::Rng;

fn ingest_random_walk(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");

    for record_count in [10_000, 100_000] {
        group.bench_function(format!("random walk, {record_count} records"), |b| {
            let mut rng = rand::rng();
            let values: Vec<f64> = (0..record_count)
                .map(|_| rng.random_range(0.0..200.0))
                .collect();

            b.iter(|| {
                let mut driver = Driver::new(Config::new().time_gap(500)).unwrap();
                for &v in &values {
                    driver.ingest(&DenseRecord::numeric(vec![v])).unwrap();
                }
                driver.cluster_count()
            });
        });
    }
}

fn ingest_dense_attractor(c: &mut Criterion) {
    let mut group = c.benchmark_group("ingest");

    group.bench_function("single attractor, 100_000 records", |b| {
        b.iter(|| {
            let mut driver = Driver::new(Config::new().time_gap(500)).unwrap();
            let record = DenseRecord::numeric(vec![5.0]);
            for _ in 0..100_000 {
                driver.ingest(&record).unwrap();
            }
            driver.cluster_count()
        });
    });
}

criterion_group!(benches, ingest_random_walk, ingest_dense_attractor);
criterion_main!(benches);
