//! Performance benchmarks for topic derivation and reconciliation.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use live_telemetry::{
    derive_topics, reconcile, ConnectionBroker, FeedConfig, Member, MemoryTransport,
    MessageCallback, SubscriptionTable, Topic,
};
use std::sync::Arc;

fn members(count: usize) -> Vec<Member> {
    (0..count).map(|i| Member::id(format!("node{i}"))).collect()
}

fn noop(_topic: &Topic) -> MessageCallback {
    Arc::new(|_| {})
}

/// Benchmark topic derivation with varying member counts
fn bench_derive_topics(c: &mut Criterion) {
    let mut group = c.benchmark_group("derive_topics");
    let metrics = ["temp", "ph", "ec", "telemetry"];

    for count in [1, 10, 100, 1000] {
        let members = members(count);
        group.bench_with_input(BenchmarkId::new("members", count), &members, |b, members| {
            b.iter(|| derive_topics(black_box(Some("rack-1")), black_box(members), &metrics));
        });
    }

    group.finish();
}

/// Benchmark reconciliation alternating between two overlapping topic sets
fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();
    let transport = MemoryTransport::new();
    let broker = ConnectionBroker::new(transport, FeedConfig::default());
    let handle = runtime.block_on(broker.acquire()).unwrap();

    for count in [10, 100, 1000] {
        let all = members(count + count / 10);
        let first = derive_topics(Some("rack-1"), &all[..count], &["temp"]);
        let second = derive_topics(Some("rack-1"), &all[count / 10..], &["temp"]);

        group.bench_function(BenchmarkId::new("churn_10pct", count), |b| {
            let mut table = SubscriptionTable::new();
            reconcile(&handle, &first, &mut table, noop);
            let mut flip = false;
            b.iter(|| {
                let desired = if flip { &first } else { &second };
                flip = !flip;
                reconcile(&handle, black_box(desired), &mut table, noop)
            });
        });

        group.bench_function(BenchmarkId::new("steady_state", count), |b| {
            let mut table = SubscriptionTable::new();
            reconcile(&handle, &first, &mut table, noop);
            b.iter(|| reconcile(&handle, black_box(&first), &mut table, noop));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_derive_topics, bench_reconcile);
criterion_main!(benches);
