//! Synthetic capture streams for tests and benchmarks
//!
//! Builds what the device would send for clean input: BT.656 line streams
//! with timing reference codes, PCM streams with intact sample markers, and
//! chunked deliveries interleaving both.

#![cfg(any(test, feature = "benchmark"))]

use crate::types::wire::{chunk, pcm};
use crate::types::{FrameGeometry, Trc};

/// Vertical blanking lines emitted before the active lines of each field.
pub const VBI_LINES: usize = 2;

/// Horizontal blanking bytes between EAV and the next SAV.
const HBLANK: [u8; 4] = [0x80, 0x10, 0x80, 0x10];

/// Payload byte for `col` of active line `line` in `field` (0 or 1).
///
/// Never 0x00 or 0xff, so synthetic payload cannot form a preamble.
pub fn pixel(field: usize, line: usize, col: usize, seed: u8) -> u8 {
    let mix = field * 131 + line * 7 + col + seed as usize;
    0x10 + (mix % 0xe0) as u8
}

fn push_trc(out: &mut Vec<u8>, trc: Trc) {
    out.extend_from_slice(&[0xff, 0x00, 0x00, trc.value()]);
}

fn push_blank_line(out: &mut Vec<u8>, field_two: bool, width: usize) {
    push_trc(out, Trc::from_flags(false, true, field_two));
    out.extend(HBLANK.iter().copied().cycle().take(width));
    push_trc(out, Trc::from_flags(true, true, field_two));
    out.extend_from_slice(&HBLANK);
}

/// Active line of one field, optionally carrying `excess` extra payload
/// bytes before its EAV.
pub fn active_line(
    geometry: &FrameGeometry,
    field: usize,
    line: usize,
    seed: u8,
    excess: usize,
) -> Vec<u8> {
    let field_two = field == 1;
    let mut out = Vec::with_capacity(geometry.line_width + excess + 16);
    push_trc(&mut out, Trc::from_flags(false, false, field_two));
    out.extend((0..geometry.line_width + excess).map(|col| pixel(field, line, col, seed)));
    push_trc(&mut out, Trc::from_flags(true, false, field_two));
    out.extend_from_slice(&HBLANK);
    out
}

/// Video substream of one field: blanking lines then `lines` active lines.
pub fn bt656_field(geometry: &FrameGeometry, field: usize, lines: usize, seed: u8) -> Vec<u8> {
    let mut out = Vec::new();
    for _ in 0..VBI_LINES {
        push_blank_line(&mut out, field == 1, 8);
    }
    for line in 0..lines {
        out.extend(active_line(geometry, field, line, seed, 0));
    }
    out
}

/// Video substream of one complete interlaced frame.
pub fn bt656_frame(geometry: &FrameGeometry, seed: u8) -> Vec<u8> {
    let lines = geometry.lines_per_field();
    let mut out = bt656_field(geometry, 0, lines, seed);
    out.extend(bt656_field(geometry, 1, lines, seed));
    out
}

/// The woven frame the assembler should produce from [`bt656_frame`].
pub fn expected_frame(geometry: &FrameGeometry, seed: u8) -> Vec<u8> {
    let mut out = vec![0u8; geometry.expected_size()];
    for (row, line) in out.chunks_exact_mut(geometry.line_width).enumerate() {
        let (field, field_line) = (row % 2, row / 2);
        for (col, byte) in line.iter_mut().enumerate() {
            *byte = pixel(field, field_line, col, seed);
        }
    }
    out
}

/// PCM stream with intact markers: every four-byte slot starts with zero.
pub fn marked_pcm(seed: u8, len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| {
            if i % 4 == 0 {
                pcm::SAMPLE_MARKER
            } else {
                0x01 + ((i + seed as usize) % 0xfe) as u8
            }
        })
        .collect()
}

/// Split a substream into chunk-sized payloads.
pub fn audio_payloads(stream: &[u8]) -> impl Iterator<Item = &[u8]> {
    stream.chunks(chunk::PAYLOAD_LEN)
}

/// Wrap one payload in a chunk, padding short payloads with `fill`.
pub fn make_chunk(magic: u32, payload: &[u8], fill: u8) -> Vec<u8> {
    let mut out = Vec::with_capacity(chunk::SIZE);
    out.extend_from_slice(&magic.to_be_bytes());
    out.extend_from_slice(&payload[..payload.len().min(chunk::PAYLOAD_LEN)]);
    out.resize(chunk::SIZE, fill);
    out
}

/// Interleave a video and an audio substream into deliveries of
/// `chunks_per_delivery` chunks, alternating video and audio while both last.
pub fn deliveries(video: &[u8], audio: &[u8], chunks_per_delivery: usize) -> Vec<Vec<u8>> {
    let mut video_chunks = video.chunks(chunk::PAYLOAD_LEN);
    let mut audio_chunks = audio.chunks(chunk::PAYLOAD_LEN);
    let mut chunks = Vec::new();
    loop {
        let v = video_chunks.next();
        let a = audio_chunks.next();
        if v.is_none() && a.is_none() {
            break;
        }
        if let Some(v) = v {
            // Horizontal blanking filler is dropped by the assembler.
            chunks.push(make_chunk(chunk::VIDEO_MAGIC, v, 0x10));
        }
        if let Some(a) = a {
            chunks.push(make_chunk(chunk::AUDIO_MAGIC, a, 0x00));
        }
    }

    chunks.chunks(chunks_per_delivery.max(1)).map(|group| group.concat()).collect()
}
