//! Sample-boundary realignment of the PCM substream
//!
//! The device sends 24-bit samples in 32-bit slots whose first byte is
//! always zero, so every stereo frame of `stride` bytes carries a zero
//! marker at offset 0 and at `stride / 2`. Lost or corrupted bytes show up
//! as markers in the wrong place; the resynchronizer detects this, pads the
//! ring forward to the next frame boundary and resumes at the next marker
//! pair so the ring never holds a frame straddling a tear.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::ring::{AudioCursor, PcmRing};
use crate::types::wire::pcm::SAMPLE_MARKER;

/// Receiver of period completion events.
///
/// Called from the producer context after the ring lock is released, once
/// per period boundary crossed. Implementations must not block.
///
/// How faithfully those calls reach the consumer depends on the sink. The
/// [`AtomicU64`] sink counts every crossing. The [`tokio::sync::Notify`]
/// sink stores at most one permit, so crossings that land before the
/// consumer wakes coalesce into a single wakeup; a consumer on `Notify`
/// should read [`PcmRing::pointer`] to see how far the ring advanced.
pub trait PeriodSink: Send + Sync {
    fn on_period_elapsed(&self);
}

/// Wakes one waiter; crossings coalesce while no one is waiting.
impl PeriodSink for tokio::sync::Notify {
    fn on_period_elapsed(&self) {
        self.notify_one();
    }
}

impl PeriodSink for AtomicU64 {
    fn on_period_elapsed(&self) {
        self.fetch_add(1, Ordering::Relaxed);
    }
}

/// What happened to one audio chunk payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioOutcome {
    /// No ring attached or the consumer is not capturing.
    Idle,
    /// Bytes were copied into the ring.
    Written { bytes: usize, periods: usize },
    /// No marker pair found; the payload was discarded.
    Dropped { bytes: usize },
}

/// Aligns the degraded PCM byte stream onto frame boundaries of a [`PcmRing`].
#[derive(Default)]
pub struct AudioResync {
    ring: Option<PcmRing>,
    sink: Option<Arc<dyn PeriodSink>>,
    realignments: u64,
    bytes_dropped: u64,
}

impl AudioResync {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the consumer's ring and period listener.
    pub fn attach(&mut self, ring: PcmRing, sink: Arc<dyn PeriodSink>) {
        ring.prepare();
        self.ring = Some(ring);
        self.sink = Some(sink);
    }

    /// Detach the ring, returning it to the caller.
    pub fn detach(&mut self) -> Option<PcmRing> {
        self.sink = None;
        self.ring.take()
    }

    pub fn ring(&self) -> Option<&PcmRing> {
        self.ring.as_ref()
    }

    /// Return the cursor to its initial state.
    pub fn reset(&mut self) {
        if let Some(ring) = &self.ring {
            ring.prepare();
        }
    }

    /// Number of tears that forced a realignment.
    pub fn realignments(&self) -> u64 {
        self.realignments
    }

    pub fn bytes_dropped(&self) -> u64 {
        self.bytes_dropped
    }

    /// Feed one audio chunk payload.
    pub fn process(&mut self, data: &[u8]) -> AudioOutcome {
        let Some(ring) = self.ring.as_ref() else {
            return AudioOutcome::Idle;
        };
        let stride = ring.params().stride();
        let half = stride / 2;
        let period_samples = ring.params().period_frames * 2;
        if half == 0 {
            return AudioOutcome::Idle;
        }

        let mut periods = 0;
        let written = {
            let mut guard = ring.lock();
            let state = &mut *guard;
            if !state.capturing || state.area.is_empty() {
                return AudioOutcome::Idle;
            }
            let capacity = state.area.len();
            let cursor = &mut state.cursor;
            let mut offset = cursor.read_offset;
            let mut advanced = 0;

            // The marker just before the continuation point must be intact,
            // otherwise the tail of the previous write was torn.
            if cursor.primed {
                let marker = (cursor.write_ptr + capacity + offset - half) % capacity;
                if state.area[marker] != SAMPLE_MARKER {
                    advanced += pad_to_frame(cursor, stride, capacity);
                    offset = 0;
                    cursor.read_offset = 0;
                    self.realignments += 1;
                    trace!(write_ptr = cursor.write_ptr, "PCM tear at previous write");
                }
            }

            let mut rest = data;
            let mut skipped = 0;
            while rest.len() > stride
                && (rest[offset] != SAMPLE_MARKER || rest[offset + half] != SAMPLE_MARKER)
            {
                rest = &rest[1..];
                skipped += 1;
            }

            if rest.len() <= stride {
                cursor.read_offset = 0;
                self.bytes_dropped += data.len() as u64;
                trace!(bytes = data.len(), "PCM payload without marker pair dropped");
                return AudioOutcome::Dropped { bytes: data.len() };
            }

            if skipped != 0 {
                advanced += pad_to_frame(cursor, stride, capacity);
                rest = &rest[offset..];
                self.bytes_dropped += (skipped + offset) as u64;
                offset = 0;
                self.realignments += 1;
                trace!(skipped, write_ptr = cursor.write_ptr, "PCM realigned mid-delivery");
            }

            // First marker of the next delivery, given it continues this one.
            cursor.read_offset = (half - (rest.len() - offset) % half) % half;

            let mut dst = cursor.write_ptr;
            let mut src = rest;
            while !src.is_empty() {
                let n = (capacity - dst).min(src.len());
                state.area[dst..dst + n].copy_from_slice(&src[..n]);
                dst = (dst + n) % capacity;
                src = &src[n..];
            }
            cursor.write_ptr = dst;
            cursor.primed = true;
            advanced += rest.len();

            let total = cursor.residual_bytes + advanced;
            cursor.complete_samples += total / half;
            cursor.residual_bytes = total % half;
            while cursor.complete_samples >= period_samples {
                cursor.complete_samples -= period_samples;
                periods += 1;
            }

            rest.len()
        };

        if let Some(sink) = &self.sink {
            for _ in 0..periods {
                sink.on_period_elapsed();
            }
        }

        AudioOutcome::Written { bytes: written, periods }
    }
}

impl std::fmt::Debug for AudioResync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioResync")
            .field("ring", &self.ring)
            .field("realignments", &self.realignments)
            .field("bytes_dropped", &self.bytes_dropped)
            .finish_non_exhaustive()
    }
}

/// Move the write pointer to the next frame boundary. Returns bytes skipped.
fn pad_to_frame(cursor: &mut AudioCursor, stride: usize, capacity: usize) -> usize {
    let skip = (stride - cursor.write_ptr % stride) % stride;
    cursor.write_ptr = (cursor.write_ptr + skip) % capacity;
    skip
}
