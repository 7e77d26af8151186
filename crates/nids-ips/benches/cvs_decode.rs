//! CVS decoder benchmark
//!
//! Measures `Entry` validation over command streams of growing length,
//! and full engine inspection with deduplicated rules.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use nids_common::{MetricsRegistry, Packet};
use nids_ips::{CvsCheck, CvsOption, DetectionEngine, OptionRegistry};
use std::sync::Arc;

fn command_stream(entries: usize) -> Vec<u8> {
    let mut data = b"Root /cvsroot\nValid-responses ok error\n".to_vec();
    for i in 0..entries {
        let lines = format!("Entry /file{}.c/1.{}///\nUnchanged file{}.c\n", i, i, i);
        data.extend_from_slice(lines.as_bytes());
    }
    data
}

fn decode_benchmark(c: &mut Criterion) {
    let option = CvsOption::new(CvsCheck::InvalidEntry);
    let mut group = c.benchmark_group("cvs_decode");

    for entries in [1usize, 16, 256].iter() {
        let data = command_stream(*entries);
        group.throughput(Throughput::Bytes(data.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(entries), &data, |b, data| {
            b.iter(|| option.decode(black_box(data)))
        });
    }

    group.finish();
}

fn engine_benchmark(c: &mut Criterion) {
    let mut engine = DetectionEngine::new(
        OptionRegistry::with_builtins(),
        Arc::new(MetricsRegistry::new()),
    );
    for sid in 0..100 {
        engine.add_rule(sid, "cvs: invalid-entry;").expect("valid rule");
    }

    let data = command_stream(16);
    c.bench_function("engine_inspect_100_rules", |b| {
        b.iter(|| engine.inspect(Some(&Packet::tcp(1024, 2401, black_box(&data)))))
    });
}

criterion_group!(benches, decode_benchmark, engine_benchmark);
criterion_main!(benches);
