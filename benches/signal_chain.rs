//! Criterion benchmarks for the per-sample hot path.
//!
//! Every packet from the device passes through the CRC, the field readers and the
//! signal chain inside the transport's delivery callback, so each of these has to
//! stay well below the sample period.
//!
//! Run with: cargo bench --bench signal_chain

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sensor_stream::channel::ChannelKey;
use sensor_stream::codec::{crc, Message, Packet};
use sensor_stream::config::StreamConfig;
use sensor_stream::data::{CorrectorParams, DiscontinuityCorrector, ExtractorConfig, SignalExtractor};
use sensor_stream::StreamSession;

fn crc_throughput(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc16");

    for size in [16usize, 256, 4096] {
        let data: Vec<u8> = (0..size).map(|i| i as u8).collect();
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("table", size), &data, |b, data| {
            b.iter(|| crc::crc16(black_box(data)));
        });
        group.bench_with_input(BenchmarkId::new("bitwise", size), &data, |b, data| {
            b.iter(|| {
                black_box(data)
                    .iter()
                    .fold(crc::INITIAL, |acc, &byte| crc::update_bitwise(acc, byte))
            });
        });
    }

    group.finish();
}

/// Corrector alone, on a slow ramp that never trips the detector.
fn corrector_push(c: &mut Criterion) {
    c.bench_function("corrector_push", |b| {
        let mut corrector = DiscontinuityCorrector::new(CorrectorParams::default());
        let mut x = 0.0;
        b.iter(|| {
            x += 0.001;
            black_box(corrector.push(x, x * 0.1))
        });
    });
}

/// Full extractor cycle for different window sizes.
fn extractor_push(c: &mut Criterion) {
    let mut group = c.benchmark_group("extractor_push");

    for window_size in [11usize, 99, 999] {
        group.bench_with_input(
            BenchmarkId::from_parameter(window_size),
            &window_size,
            |b, &window_size| {
                let mut extractor = SignalExtractor::new(ExtractorConfig {
                    window_size,
                    ..ExtractorConfig::default()
                });
                let mut i = 0u64;
                b.iter(|| {
                    i += 1;
                    let x = i as f64 * 0.001;
                    black_box(extractor.push(x, (x * 50.0).sin(), 0))
                });
            },
        );
    }

    group.finish();
}

/// CRC check, decode and routing of one encoded sample frame.
fn session_ingest(c: &mut Criterion) {
    let frame = Message::Sample {
        channel: ChannelKey::Main,
        packet: Packet {
            timestamp: 1.0,
            channel0_raw: 12_345,
            offset1: -20.0,
            offset2: 3,
            gain: 8.0,
        },
    }
    .encode()
    .unwrap();

    c.bench_function("session_ingest", |b| {
        let mut session = StreamSession::from_config(&StreamConfig::default());
        b.iter(|| session.ingest(black_box(&frame)));
    });
}

criterion_group!(benches, crc_throughput, corrector_push, extractor_push, session_ingest);
criterion_main!(benches);
