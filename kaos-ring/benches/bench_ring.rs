//! Ring throughput across producer/consumer patterns
//!
//! Run: cargo bench --bench bench_ring

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;

use kaos_ring::{BackoffKind, Behavior, Ring, RingConfig};

const RING_SIZE: usize = 64 * 1024; // 64K slots
const BATCH_SIZE: usize = 64;
const TOTAL_EVENTS: u64 = 1_000_000; // 1M events
const SINGLE_EVENTS: u64 = 100_000; // 100K for per-element benchmarks

fn ring_u64(backoff: BackoffKind) -> Arc<Ring<'static>> {
    let config = RingConfig::new(8)
        .unwrap()
        .with_slots(RING_SIZE)
        .unwrap()
        .with_backoff(backoff);
    Arc::new(Ring::allocate(config).unwrap())
}

/// `producers` x `consumers`, batches of `batch`, `events` total.
fn run_pattern(producers: u64, consumers: usize, batch: usize, events: u64) -> u64 {
    let ring = ring_u64(BackoffKind::Exponential);
    let per_producer = events / producers;
    let total = per_producer * producers;
    let received = Arc::new(AtomicU64::new(0));

    let consumer_handles: Vec<_> = (0..consumers)
        .map(|_| {
            let ring_cons = ring.clone();
            let recv = received.clone();
            thread::spawn(move || {
                let mut buf = vec![0u64; batch];
                while recv.load(Ordering::Relaxed) < total {
                    let n = ring_cons
                        .dequeue_slice(&mut buf, Behavior::Variable)
                        .unwrap();
                    if n > 0 {
                        std::hint::black_box(&buf[..n]);
                        recv.fetch_add(n as u64, Ordering::Relaxed);
                    } else {
                        std::hint::spin_loop();
                    }
                }
            })
        })
        .collect();

    let producer_handles: Vec<_> = (0..producers)
        .map(|_| {
            let ring_prod = ring.clone();
            thread::spawn(move || {
                let items: Vec<u64> = (0..batch as u64).collect();
                let mut sent = 0u64;
                while sent < per_producer {
                    let want = ((per_producer - sent) as usize).min(batch);
                    let n = ring_prod
                        .enqueue_slice(&items[..want], Behavior::Variable)
                        .unwrap();
                    if n == 0 {
                        std::hint::spin_loop();
                    }
                    sent += n as u64;
                }
            })
        })
        .collect();

    for h in producer_handles {
        h.join().unwrap();
    }
    for h in consumer_handles {
        h.join().unwrap();
    }
    received.load(Ordering::Acquire)
}

/// Single-threaded enqueue then dequeue of one batch, no contention.
fn bench_uncontended_bulk(c: &mut Criterion) {
    let mut group = c.benchmark_group("Uncontended");
    let ring = ring_u64(BackoffKind::Spin);

    for batch in [1usize, 8, 64, 512] {
        let items: Vec<u64> = (0..batch as u64).collect();
        let mut out = vec![0u64; batch];
        group.throughput(Throughput::Elements(batch as u64));
        group.bench_function(BenchmarkId::new("bulk", batch), |b| {
            b.iter(|| {
                ring.enqueue_slice(&items, Behavior::Fixed).unwrap();
                ring.dequeue_slice(&mut out, Behavior::Fixed).unwrap();
                std::hint::black_box(&out);
            })
        });
    }
    group.finish();
}

fn benchmark_patterns(c: &mut Criterion) {
    let mut group = c.benchmark_group("Multi-Pattern");
    group.throughput(Throughput::Elements(TOTAL_EVENTS));
    group.sample_size(10);

    group.bench_function(BenchmarkId::new("pattern", "SPSC-batch"), |b| {
        b.iter(|| run_pattern(1, 1, BATCH_SIZE, TOTAL_EVENTS))
    });

    group.bench_function(BenchmarkId::new("pattern", "MPMC-2p2c-batch"), |b| {
        b.iter(|| run_pattern(2, 2, BATCH_SIZE, TOTAL_EVENTS))
    });

    group.bench_function(BenchmarkId::new("pattern", "MPMC-4p4c-batch"), |b| {
        b.iter(|| run_pattern(4, 4, BATCH_SIZE, TOTAL_EVENTS))
    });

    group.finish();

    let mut group = c.benchmark_group("Per-Element");
    group.throughput(Throughput::Elements(SINGLE_EVENTS));
    group.sample_size(10);

    group.bench_function(BenchmarkId::new("pattern", "MPMC-2p2c-single"), |b| {
        b.iter(|| run_pattern(2, 2, 1, SINGLE_EVENTS))
    });

    group.finish();
}

criterion_group!(benches, bench_uncontended_bulk, benchmark_patterns);
criterion_main!(benches);
