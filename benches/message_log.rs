//! Message log benchmark suite.
//!
//! Benchmarks the hot paths of the bounded message log:
//! - Append below and at capacity (eviction on every push)
//! - Filtered queries over a full buffer
//! - Batch parsing of a large command list
//!
//! Run with: cargo bench --bench message_log
//! Results saved to: target/criterion/

use std::hint::black_box;

use cdp_inspector::protocol::Message;
use cdp_inspector::session::{DirectionFilter, MessageFilter, MessageLog, parse_batch};
use cdp_inspector::TargetId;
use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const CAPACITIES: &[usize] = &[1_000, 100_000];
const QUERY_SIZE: usize = 10_000;
const BATCH_COMMANDS: usize = 500;

// ============================================================================
// Helpers
// ============================================================================

fn sample(target: &TargetId, n: usize) -> Message {
    Message::outgoing(
        target.clone(),
        "Runtime.evaluate",
        json!({ "expression": format!("window.value{n}"), "returnByValue": true }),
    )
}

// ============================================================================
// Benchmark: Append
// ============================================================================

fn bench_append(c: &mut Criterion) {
    let target = TargetId::from("bench");
    let mut group = c.benchmark_group("log_append");
    group.throughput(Throughput::Elements(1));

    for &capacity in CAPACITIES {
        group.bench_with_input(
            BenchmarkId::new("at_capacity", capacity),
            &capacity,
            |b, &capacity| {
                let log = MessageLog::new(capacity);
                for n in 0..capacity {
                    log.append(&target, sample(&target, n));
                }

                let mut n = 0;
                b.iter(|| {
                    n += 1;
                    log.append(&target, black_box(sample(&target, n)));
                });
            },
        );
    }

    group.finish();
}

// ============================================================================
// Benchmark: Query
// ============================================================================

fn bench_query(c: &mut Criterion) {
    let target = TargetId::from("bench");
    let log = MessageLog::new(QUERY_SIZE);
    for n in 0..QUERY_SIZE {
        log.append(&target, sample(&target, n));
        log.append(
            &target,
            Message::result(target.clone(), "Runtime.evaluate", json!({ "result": { "value": n } })),
        );
    }

    let mut group = c.benchmark_group("log_query");
    group.sample_size(20);

    group.bench_function("direction", |b| {
        let filter = MessageFilter::new().with_direction(DirectionFilter::Incoming);
        b.iter(|| black_box(log.query(&target, &filter)));
    });

    group.bench_function("search", |b| {
        let filter = MessageFilter::new().with_search("VALUE42");
        b.iter(|| black_box(log.query(&target, &filter)));
    });

    group.finish();
}

// ============================================================================
// Benchmark: Batch Parsing
// ============================================================================

fn bench_parse_batch(c: &mut Criterion) {
    let text: String = (0..BATCH_COMMANDS)
        .map(|n| format!("Runtime.evaluate\n{{\n  \"expression\": \"f({{ n: {n} }})\"\n}}\n"))
        .collect();

    c.bench_function("parse_batch", |b| {
        b.iter(|| black_box(parse_batch(black_box(&text))));
    });
}

criterion_group!(benches, bench_append, bench_query, bench_parse_batch);
criterion_main!(benches);
