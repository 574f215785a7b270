//! Criterion benchmarks for the sibuf relay engine
//!
//! Run with: cargo bench -p sibuf-core
#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use sibuf_core::{
    Channel, Engine, EngineConfig, PolicyKind, RingQueue, RoundRobinPolicy, SerialPort,
};

const RECORD_COUNTS: &[usize] = &[16, 64, 256];

/// Input port replaying a fixed buffer.
struct Replay<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl SerialPort for Replay<'_> {
    fn is_readable(&self) -> bool {
        self.pos < self.bytes.len()
    }
    fn read_byte(&mut self) -> u8 {
        let b = self.bytes[self.pos];
        self.pos += 1;
        b
    }
    fn is_writable(&self) -> bool {
        false
    }
    fn write_byte(&mut self, _byte: u8) {}
}

/// Shared line that accepts everything and discards it.
struct Sink;

impl SerialPort for Sink {
    fn is_readable(&self) -> bool {
        false
    }
    fn read_byte(&mut self) -> u8 {
        0
    }
    fn is_writable(&self) -> bool {
        true
    }
    fn write_byte(&mut self, byte: u8) {
        black_box(byte);
    }
}

fn generate_punches(count: usize, station: u8) -> Vec<u8> {
    (0..count)
        .flat_map(|i| {
            let mut rec = vec![0x02, 0xD3, 13, 0x00, station];
            rec.extend((i as u32).to_be_bytes());
            rec.extend([0x01, 0x30, 0x39, 0x00, 0x00, 0x00, 0x00]);
            rec.extend([0xAB, 0xCD, 0x03]);
            rec
        })
        .collect()
}

fn bench_queue(c: &mut Criterion) {
    let mut group = c.benchmark_group("RingQueue");

    group.bench_function("write_read_1k", |b| {
        let mut queue = RingQueue::new(1024);
        b.iter(|| {
            for i in 0..1024u32 {
                let _ = queue.write(black_box(i as u8));
            }
            while let Some(byte) = queue.read() {
                black_box(byte);
            }
        });
    });

    group.finish();
}

fn bench_channel(c: &mut Criterion) {
    let mut group = c.benchmark_group("Channel");
    let config = EngineConfig::default();

    for &count in RECORD_COUNTS {
        let stream = generate_punches(count, 31);

        group.bench_with_input(BenchmarkId::new("frame", count), &count, |b, _| {
            b.iter(|| {
                let mut channel = Channel::new(0, &config);
                for &byte in &stream {
                    channel.receive(byte);
                    channel.advance();
                    if channel.grant() {
                        while let Some(out) = channel.take_output() {
                            black_box(out);
                        }
                        channel.advance();
                    }
                }
            });
        });
    }

    group.finish();
}

fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("Engine");

    for &count in RECORD_COUNTS {
        let a = generate_punches(count, 31);
        let b_stream = generate_punches(count, 32);

        group.bench_with_input(BenchmarkId::new("priority", count), &count, |b, _| {
            b.iter(|| {
                let mut engine = Engine::new(EngineConfig::default()).unwrap();
                let mut inputs = [
                    Replay { bytes: &a, pos: 0 },
                    Replay { bytes: &b_stream, pos: 0 },
                ];
                black_box(engine.run_until_idle(&mut inputs, &mut Sink, u64::MAX))
            });
        });

        group.bench_with_input(BenchmarkId::new("round_robin", count), &count, |b, _| {
            b.iter(|| {
                let mut engine =
                    Engine::with_policy(EngineConfig::default(), RoundRobinPolicy::default())
                        .unwrap();
                let mut inputs = [
                    Replay { bytes: &a, pos: 0 },
                    Replay { bytes: &b_stream, pos: 0 },
                ];
                black_box(engine.run_until_idle(&mut inputs, &mut Sink, u64::MAX))
            });
        });
    }

    // Dynamic dispatch cost of a runtime-selected policy
    group.bench_function("boxed_policy_idle_tick", |b| {
        let mut engine =
            Engine::with_policy(EngineConfig::default(), PolicyKind::RoundRobin.build()).unwrap();
        let mut inputs: [Replay<'_>; 0] = [];
        b.iter(|| black_box(engine.tick(&mut inputs, &mut Sink)));
    });

    group.finish();
}

criterion_group!(benches, bench_queue, bench_channel, bench_engine);
criterion_main!(benches);
