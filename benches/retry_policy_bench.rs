//! Benchmark for retry delay computation and payload wrapping

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ledger_submit::{RetryPolicy, SignedTransaction};

fn bench_delay_after(c: &mut Criterion) {
    let mut group = c.benchmark_group("retry_delay");

    let policies = [
        ("submission", RetryPolicy::submission()),
        ("confirmation", RetryPolicy::confirmation()),
        ("fixed", RetryPolicy::fixed(10, std::time::Duration::from_millis(400))),
    ];

    for (name, policy) in policies.iter() {
        group.bench_with_input(BenchmarkId::new("delay_after", name), policy, |b, policy| {
            b.iter(|| {
                for attempt in 1..policy.attempts() {
                    black_box(policy.delay_after(black_box(attempt)));
                }
            });
        });
    }

    group.finish();
}

fn bench_payload_clone(c: &mut Criterion) {
    let tx = SignedTransaction::from_bytes(vec![0x5a; 1232]).unwrap();

    c.bench_function("signed_transaction_clone", |b| {
        b.iter(|| black_box(tx.clone()));
    });
}

criterion_group!(benches, bench_delay_after, bench_payload_clone);
criterion_main!(benches);
