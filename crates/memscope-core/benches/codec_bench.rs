//! Criterion benchmarks for the memscope wire codec.
//!
//! Measures the two hot paths of a large memory dump: expanding run-length
//! chunk bodies, and decoding region-info records during enumeration.
//!
//! Run with:
//! ```bash
//! cargo bench --package memscope-core --bench codec_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use memscope_core::protocol::compression::decode_run_length;
use memscope_core::transport::mock::ScriptedTransport;
use memscope_core::WireCodec;

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// A body of `runs` pairs, each expanding to `run_len` bytes.
fn make_rle_body(runs: usize, run_len: u8) -> Vec<u8> {
    (0..runs)
        .flat_map(|i| [(i % 251) as u8, run_len])
        .collect()
}

// ── Benchmarks ────────────────────────────────────────────────────────────────

fn bench_decode_run_length(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_run_length");
    for &(runs, run_len) in &[(64usize, 255u8), (4096, 16), (32_768, 1)] {
        let body = make_rle_body(runs, run_len);
        group.throughput(Throughput::Bytes((runs * run_len as usize) as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{runs}x{run_len}")),
            &body,
            |b, body| b.iter(|| decode_run_length(black_box(body)).unwrap()),
        );
    }
    group.finish();
}

fn bench_read_chunk(c: &mut Criterion) {
    let raw = vec![0x5Au8; 64 * 1024];
    c.bench_function("read_chunk/raw_64k", |b| {
        b.iter(|| {
            let script = ScriptedTransport::new();
            script.push_raw_chunk(&raw);
            let mut codec = WireCodec::new(script);
            black_box(codec.read_chunk().unwrap())
        })
    });

    let runs: Vec<(u8, u8)> = (0..1024).map(|i| ((i % 256) as u8, 64)).collect();
    c.bench_function("read_chunk/rle_64k", |b| {
        b.iter(|| {
            let script = ScriptedTransport::new();
            script.push_rle_chunk(&runs);
            let mut codec = WireCodec::new(script);
            black_box(codec.read_chunk().unwrap())
        })
    });
}

fn bench_read_region_info(c: &mut Criterion) {
    c.bench_function("read_region_info/1000", |b| {
        b.iter(|| {
            let script = ScriptedTransport::new();
            for i in 0..1000u64 {
                script.push_region(i * 0x1000, 0x1000, (i % 0x16) as u32, (i % 8) as u32, 0);
            }
            let mut codec = WireCodec::new(script);
            for _ in 0..1000 {
                black_box(codec.read_region_info().unwrap());
            }
        })
    });
}

criterion_group!(
    benches,
    bench_decode_run_length,
    bench_read_chunk,
    bench_read_region_info
);
criterion_main!(benches);
