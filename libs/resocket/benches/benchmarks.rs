//! Benchmarks for the resocket library
//!
//! Run with: cargo bench -p resocket

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::time::Duration;

use resocket::core::bus::EventBus;
use resocket::core::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use resocket::core::correlator::{CorrelationIds, PendingRequests};
use resocket::protocol::{DataMessage, JsonCodec, Message};
use resocket::traits::reconnect::{ExponentialBackoff, FixedDelay, ReconnectionStrategy};
use resocket::traits::MessageCodec;

/// Benchmark decoding and encoding of protocol messages
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("json_codec");
    let codec = JsonCodec::new();

    let data = r#"{"type":"data","id":"42","message":"hello world"}"#;
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("decode_data", |b| {
        b.iter(|| black_box(codec.decode_text(black_box(data))))
    });

    let mixed_case = r#"{"type":"DATA","id":"42","message":"hello world"}"#;
    group.bench_function("decode_data_mixed_case_type", |b| {
        b.iter(|| black_box(codec.decode_text(black_box(mixed_case))))
    });

    group.bench_function("decode_unknown_type", |b| {
        b.iter(|| black_box(codec.decode_text(black_box(r#"{"type":"unknown"}"#))))
    });

    let message = Message::data("42", "hello world");
    group.bench_function("encode_data", |b| {
        b.iter(|| black_box(codec.encode_text(black_box(&message))))
    });

    group.finish();
}

/// Benchmark correlation id allocation and waiter bookkeeping
fn bench_correlation(c: &mut Criterion) {
    let mut group = c.benchmark_group("correlation");

    group.bench_function("next_id", |b| {
        let ids = CorrelationIds::new();
        b.iter(|| black_box(ids.next_id()))
    });

    group.bench_function("register_and_complete", |b| {
        let ids = CorrelationIds::new();
        let pending = PendingRequests::new();
        b.iter(|| {
            let id = ids.next_id();
            let guard = pending.register(&id);
            black_box(pending.complete(DataMessage::new(id.to_string(), "X")));
            drop(guard);
        })
    });

    group.finish();
}

/// Benchmark event fan-out
fn bench_event_bus(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_bus");
    group.throughput(Throughput::Elements(1));

    for listeners in [1usize, 4, 16] {
        group.bench_function(format!("publish_{}_listeners", listeners), |b| {
            let bus = EventBus::new();
            let mut streams: Vec<_> = (0..listeners).map(|_| bus.subscribe()).collect();
            b.iter(|| {
                bus.publish(black_box(7u64));
                for stream in streams.iter_mut() {
                    black_box(stream.try_recv());
                }
            })
        });
    }

    group.finish();
}

/// Benchmark atomic state and metrics operations
fn bench_atomics(c: &mut Criterion) {
    let mut group = c.benchmark_group("atomics");

    group.bench_function("state_get", |b| {
        let state = AtomicConnectionState::new(ConnectionState::Connected);
        b.iter(|| black_box(state.get()))
    });

    group.bench_function("metrics_increment_received", |b| {
        let metrics = AtomicMetrics::new();
        b.iter(|| metrics.increment_received())
    });

    group.finish();
}

/// Benchmark reconnection strategy calculations
fn bench_reconnection_strategies(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconnection_strategies");

    group.bench_function("exponential_backoff_next_delay", |b| {
        let strategy = ExponentialBackoff::new(Duration::from_millis(100), Duration::from_secs(30));
        b.iter(|| black_box(strategy.next_delay(black_box(5))))
    });

    group.bench_function("fixed_delay_next_delay", |b| {
        let strategy = FixedDelay::default();
        b.iter(|| black_box(strategy.next_delay(black_box(5))))
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_codec,
    bench_correlation,
    bench_event_bus,
    bench_atomics,
    bench_reconnection_strategies,
);
criterion_main!(benches);
