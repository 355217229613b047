use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mobility_engine::{rank_trips, Trip};

fn create_test_trips(count: usize, presorted: bool) -> Vec<Trip> {
    (0..count)
        .map(|i| {
            // Cheap deterministic scatter when not presorted
            let km = if presorted {
                i as f64 * 0.1
            } else {
                ((i * 7919) % count) as f64 * 0.1
            };
            Trip::new(format!("trip_{}", i))
                .with_vendor((i % 3) as i64 + 1, format!("Vendor {}", i % 3 + 1))
                .with_duration(300 + (i % 50) as i64 * 30)
                .with_analytics(km, 20.0 + (i % 15) as f64, (i % 24) as u32)
        })
        .collect()
}

fn bench_quicksort_ranking(c: &mut Criterion) {
    let scattered_100 = create_test_trips(100, false);
    let scattered_1000 = create_test_trips(1000, false);
    let presorted_1000 = create_test_trips(1000, true);

    c.bench_function("rank_scattered_100", |b| {
        b.iter(|| black_box(rank_trips(&scattered_100, "distance", "desc", 100).unwrap()));
    });

    c.bench_function("rank_scattered_1000", |b| {
        b.iter(|| black_box(rank_trips(&scattered_1000, "distance", "desc", 100).unwrap()));
    });

    c.bench_function("rank_presorted_1000_worst_case", |b| {
        b.iter(|| black_box(rank_trips(&presorted_1000, "distance", "asc", 100).unwrap()));
    });
}

criterion_group!(benches, bench_quicksort_ranking);
criterion_main!(benches);
