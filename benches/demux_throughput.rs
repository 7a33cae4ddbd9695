//! Benchmarks for delivery processing throughput
//!
//! Measures the per-delivery cost on the transfer completion path for:
//! - Video-only deliveries assembling full NTSC frames
//! - Interleaved video and audio deliveries
//! - The sync engine scanning payload without a buffer claimed
//!
//! Platform: Cross-platform (synthetic streams, CI-safe)

use std::hint::black_box;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use easycap::audio::PcmTrigger;
use easycap::test_utils::{bt656_frame, deliveries, marked_pcm};
use easycap::{CaptureConfig, CaptureStream, FrameStream, PcmParams, PcmRing, SyncEngine, VideoSink};

fn running_stream() -> (CaptureStream, FrameStream) {
    let (mut stream, frames) =
        CaptureStream::with_channel(CaptureConfig::default()).expect("default config is valid");
    let pool = stream.pool().clone();
    for _ in 0..4 {
        pool.recycle(pool.allocate(pool.expected_size()).expect("allocate")).expect("recycle");
    }
    stream.start_stream().expect("start");
    (stream, frames)
}

/// Feed every delivery, returning completed buffers to the pool.
fn run(stream: &mut CaptureStream, frames: &mut FrameStream, batches: &[Vec<u8>]) {
    for delivery in batches {
        black_box(stream.process_delivery(black_box(delivery)));
    }
    while let Some(frame) = frames.try_next_frame() {
        stream.pool().recycle(frame.buffer).expect("recycle");
    }
}

fn bench_video_frames(c: &mut Criterion) {
    let (mut stream, mut frames) = running_stream();
    let video = bt656_frame(&stream.geometry(), 0);
    let batches = deliveries(&video, &[], 8);
    let bytes: usize = batches.iter().map(Vec::len).sum();

    let mut group = c.benchmark_group("video_frames");
    group.throughput(Throughput::Bytes(bytes as u64));
    group.bench_function("ntsc_frame", |b| b.iter(|| run(&mut stream, &mut frames, &batches)));
    group.finish();
}

fn bench_interleaved(c: &mut Criterion) {
    let (mut stream, mut frames) = running_stream();
    let ring = PcmRing::new(PcmParams::default()).expect("ring");
    ring.trigger(PcmTrigger::Start);
    stream.attach_audio(ring, Arc::new(AtomicU64::new(0)));

    let video = bt656_frame(&stream.geometry(), 0);
    let audio = marked_pcm(0, video.len() / 20);
    let batches = deliveries(&video, &audio, 8);
    let bytes: usize = batches.iter().map(Vec::len).sum();

    let mut group = c.benchmark_group("interleaved");
    group.throughput(Throughput::Bytes(bytes as u64));
    group.bench_function("ntsc_frame_with_audio", |b| {
        b.iter(|| run(&mut stream, &mut frames, &batches))
    });
    group.finish();
}

struct Discard;

impl VideoSink for Discard {
    fn payload(&mut self, byte: u8) {
        black_box(byte);
    }

    fn trc(&mut self, trc: easycap::Trc) {
        black_box(trc);
    }
}

fn bench_sync_scan(c: &mut Criterion) {
    let (stream, _frames) = running_stream();
    let video = bt656_frame(&stream.geometry(), 0);

    let mut group = c.benchmark_group("sync_engine");
    group.throughput(Throughput::Bytes(video.len() as u64));
    group.bench_function("scan_frame", |b| {
        let mut engine = SyncEngine::new();
        b.iter(|| engine.scan(black_box(&video), &mut Discard))
    });
    group.finish();
}

criterion_group!(benches, bench_video_frames, bench_interleaved, bench_sync_scan);
criterion_main!(benches);
