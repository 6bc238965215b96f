//! Frame encoding and validation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pubstream_bench::utils::random_data;
use pubstream_codec::{CborCodec, Codec, JsonCodec};
use pubstream_protocol::{Decoded, FrameDecoder, FrameEncoder, Outbound};

/// Benchmark encoding then validating one session's worth of frames.
fn bench_frame_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("frame_pipeline");

    for size in [0usize, 256, 4096, 65536] {
        let body = random_data(size);
        group.throughput(Throughput::Bytes((size * 100) as u64));
        group.bench_with_input(BenchmarkId::new("100_frames", size), &body, |b, body| {
            b.iter(|| {
                let mut encoder = FrameEncoder::new("bench", "_STREAM.bench");
                let mut decoder = FrameDecoder::new("bench");
                for _ in 0..100 {
                    let (message, _) = encoder.encode(Outbound::new(body.clone())).unwrap();
                    match decoder.decode(message).unwrap() {
                        Decoded::Frame(frame) => {
                            black_box(frame);
                        }
                        Decoded::End => unreachable!(),
                    }
                }
                let completion = encoder.finish().unwrap();
                black_box(decoder.decode(completion).unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark the typed layer's codecs on a small record.
fn bench_codecs(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec");
    let record: Vec<(String, u64)> = (0..16).map(|i| (format!("field_{}", i), i)).collect();

    group.bench_function("cbor_marshal", |b| {
        b.iter(|| black_box(CborCodec.marshal(black_box(&record)).unwrap()));
    });

    group.bench_function("json_marshal", |b| {
        b.iter(|| black_box(JsonCodec.marshal(black_box(&record)).unwrap()));
    });

    let cbor = CborCodec.marshal(&record).unwrap();
    group.bench_function("cbor_unmarshal", |b| {
        b.iter(|| {
            let decoded: Vec<(String, u64)> = CborCodec.unmarshal(black_box(&cbor)).unwrap();
            black_box(decoded);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_frame_pipeline, bench_codecs);
criterion_main!(benches);
