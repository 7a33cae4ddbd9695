//! Frame assembly driven by timing reference codes.
//!
//! The assembler claims a buffer at the first active-video start marker of
//! field one, weaves the lines of both fields into it and hands it back to
//! the pool when the frame is full. A frame that breaks off early is handed
//! back with [`FrameStatus::Error`] and assembly resumes at the next frame.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use super::sync::VideoSink;
use crate::pool::{BufferPool, FrameBuffer};
use crate::types::{FrameGeometry, FrameStatus, Trc};

/// Counters kept by the assembler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssemblerStats {
    pub frames_completed: u64,
    pub frames_failed: u64,
    /// Frame starts skipped because no buffer was queued
    pub starved_frames: u64,
    /// Payload bytes dropped to keep line geometry
    pub overrun_bytes: u64,
}

/// Weaves payload bytes into the active [`FrameBuffer`].
pub struct FrameAssembler {
    pool: Arc<BufferPool>,
    geometry: FrameGeometry,
    active: Option<FrameBuffer>,
    sequence: u64,
    starving: bool,
    stats: AssemblerStats,
}

impl FrameAssembler {
    pub fn new(pool: Arc<BufferPool>, geometry: FrameGeometry) -> Self {
        Self {
            pool,
            geometry,
            active: None,
            sequence: 0,
            starving: false,
            stats: AssemblerStats::default(),
        }
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.geometry
    }

    /// Change the frame layout. Only valid while no buffer is claimed.
    pub fn set_geometry(&mut self, geometry: FrameGeometry) {
        self.geometry = geometry;
    }

    pub fn stats(&self) -> AssemblerStats {
        self.stats
    }

    pub fn has_active(&self) -> bool {
        self.active.is_some()
    }

    /// Sequence number the next finalized frame will carry.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn reset_sequence(&mut self) {
        self.sequence = 0;
        self.starving = false;
    }

    /// Return the buffer being filled to the consumer with an error status.
    pub fn abort_active(&mut self) -> bool {
        let Some(buffer) = self.active.take() else {
            return false;
        };
        debug!(handle = %buffer.handle(), pos = buffer.pos(), "Active buffer aborted");
        if let Err(err) = self.pool.release_done(buffer, FrameStatus::Error, None) {
            warn!(%err, "Aborted buffer rejected by pool");
        }
        true
    }

    fn finalize(&mut self) {
        let Some(buffer) = self.active.take() else {
            return;
        };

        let status = if buffer.pos() >= self.geometry.expected_size() {
            self.stats.frames_completed += 1;
            FrameStatus::Done
        } else {
            self.stats.frames_failed += 1;
            FrameStatus::Error
        };
        let sequence = self.sequence;
        self.sequence += 1;

        debug!(handle = %buffer.handle(), sequence, ?status, pos = buffer.pos(), "Frame finalized");
        if let Err(err) = self.pool.release_done(buffer, status, Some(sequence)) {
            warn!(%err, "Finalized buffer rejected by pool");
        }
    }

    /// Claim a buffer if `trc` may open a frame.
    fn try_open(&mut self, trc: Trc) -> bool {
        if !trc.opens_frame() {
            if trc.is_field_two() {
                self.starving = false;
            }
            return false;
        }

        match self.pool.acquire() {
            Some(buffer) => {
                trace!(handle = %buffer.handle(), sequence = self.sequence, "Frame started");
                self.active = Some(buffer);
                self.starving = false;
                true
            }
            None => {
                if !self.starving {
                    self.starving = true;
                    self.stats.starved_frames += 1;
                    trace!("No queued buffer at frame start");
                }
                false
            }
        }
    }
}

impl VideoSink for FrameAssembler {
    fn trc(&mut self, trc: Trc) {
        trace!(%trc, claimed = self.active.is_some(), "Timing reference");
        if self.active.is_none() && !self.try_open(trc) {
            return;
        }

        let lines_per_field = self.geometry.lines_per_field();
        let line_width = self.geometry.line_width.max(1);
        let Some(buffer) = self.active.as_mut() else {
            return;
        };

        if !trc.is_start_marker() {
            buffer.in_blank = true;
            return;
        }

        if trc.is_field_two() && !buffer.second_field {
            if buffer.pos() / line_width < lines_per_field {
                trace!(pos = buffer.pos(), "Field two before field one completed");
                self.finalize();
                return;
            }
            buffer.second_field = true;
            buffer.active_lines = 0;
        } else if !trc.is_field_two() && buffer.second_field {
            // Frame boundary with an unfinished frame; the same code may
            // open the next one.
            self.finalize();
            if self.try_open(trc) {
                self.trc(trc);
            }
            return;
        }

        if trc.is_active_video() {
            buffer.in_blank = false;
            buffer.active_lines += 1;
        } else {
            buffer.in_blank = true;
        }
    }

    fn payload(&mut self, byte: u8) {
        let expected = self.geometry.expected_size();
        let line_width = self.geometry.line_width;
        let lines_per_field = self.geometry.lines_per_field();
        let Some(buffer) = self.active.as_mut() else {
            return;
        };
        if buffer.in_blank || line_width == 0 {
            return;
        }

        let pos_in_line = buffer.pos() % line_width;
        let mut line = buffer.pos() / line_width;
        if line >= lines_per_field {
            line -= lines_per_field;
        }

        // The device sometimes sends more bytes than a line holds before
        // the next code arrives.
        if line + 1 != buffer.active_lines {
            self.stats.overrun_bytes += 1;
            return;
        }

        let mut offset = line * line_width * 2 + pos_in_line;
        if buffer.second_field {
            offset += line_width;
        }
        if !buffer.write_at(offset, byte, expected) {
            self.stats.overrun_bytes += 1;
            return;
        }

        if buffer.pos() >= expected {
            self.finalize();
        }
    }
}

impl std::fmt::Debug for FrameAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameAssembler")
            .field("geometry", &self.geometry)
            .field("active", &self.active.as_ref().map(|b| b.handle()))
            .field("sequence", &self.sequence)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{FrameStream, frame_channel};
    use crate::test_utils::{active_line, bt656_field, bt656_frame, expected_frame};
    use crate::video::SyncEngine;

    fn geometry() -> FrameGeometry {
        FrameGeometry::new(16, 6)
    }

    fn setup(buffers: usize) -> (SyncEngine, FrameAssembler, Arc<BufferPool>, FrameStream) {
        let (sink, frames) = frame_channel();
        let pool = Arc::new(BufferPool::new(sink, geometry()));
        for _ in 0..buffers {
            let buffer = pool.allocate(geometry().expected_size()).expect("allocate");
            pool.recycle(buffer).expect("recycle");
        }
        let assembler = FrameAssembler::new(pool.clone(), geometry());
        (SyncEngine::new(), assembler, pool, frames)
    }

    #[test]
    fn complete_frame_is_woven_and_done() {
        let (mut sync, mut assembler, _pool, mut frames) = setup(2);
        sync.scan(&bt656_frame(&geometry(), 3), &mut assembler);

        let frame = frames.try_next_frame().expect("one frame");
        assert_eq!(frame.status, FrameStatus::Done);
        assert_eq!(frame.sequence, Some(0));
        assert_eq!(frame.bytes_used, geometry().expected_size());
        assert_eq!(frame.payload(), expected_frame(&geometry(), 3).as_slice());
        assert!(frames.try_next_frame().is_none());
        assert!(!assembler.has_active());
        assert_eq!(assembler.stats().frames_completed, 1);
    }

    #[test]
    fn consecutive_frames_get_increasing_sequence() {
        let (mut sync, mut assembler, pool, mut frames) = setup(1);
        for seed in 0..3 {
            sync.scan(&bt656_frame(&geometry(), seed), &mut assembler);
            let frame = frames.try_next_frame().expect("frame");
            assert_eq!(frame.sequence, Some(seed as u64));
            assert_eq!(frame.payload(), expected_frame(&geometry(), seed).as_slice());
            pool.recycle(frame.buffer).expect("recycle");
        }
    }

    #[test]
    fn missing_field_two_completion_fails_and_recovers() {
        let (mut sync, mut assembler, _pool, mut frames) = setup(2);
        let lines = geometry().lines_per_field();
        let mut stream = bt656_field(&geometry(), 0, lines, 1);
        stream.extend(bt656_field(&geometry(), 1, lines - 1, 1));
        stream.extend(bt656_frame(&geometry(), 2));
        sync.scan(&stream, &mut assembler);

        let broken = frames.try_next_frame().expect("failed frame");
        assert_eq!(broken.status, FrameStatus::Error);
        assert_eq!(broken.bytes_used, 0);
        assert_eq!(broken.sequence, Some(0));

        let good = frames.try_next_frame().expect("next frame");
        assert_eq!(good.status, FrameStatus::Done);
        assert_eq!(good.sequence, Some(1));
        assert_eq!(good.payload(), expected_frame(&geometry(), 2).as_slice());
    }

    #[test]
    fn short_field_one_fails_at_field_two() {
        let (mut sync, mut assembler, _pool, mut frames) = setup(2);
        let lines = geometry().lines_per_field();
        let mut stream = bt656_field(&geometry(), 0, lines - 1, 1);
        stream.extend(bt656_field(&geometry(), 1, lines, 1));
        sync.scan(&stream, &mut assembler);

        let broken = frames.try_next_frame().expect("failed frame");
        assert_eq!(broken.status, FrameStatus::Error);
        assert!(!assembler.has_active());

        sync.scan(&bt656_frame(&geometry(), 4), &mut assembler);
        assert_eq!(frames.try_next_frame().map(|f| f.status), Some(FrameStatus::Done));
    }

    #[test]
    fn starvation_writes_nothing_until_buffer_and_frame_start() {
        let (mut sync, mut assembler, pool, mut frames) = setup(0);
        sync.scan(&bt656_frame(&geometry(), 0), &mut assembler);
        assert!(frames.try_next_frame().is_none());
        assert_eq!(assembler.stats().starved_frames, 1);

        let buffer = pool.allocate(geometry().expected_size()).expect("allocate");
        pool.recycle(buffer).expect("recycle");

        // Rest of a frame already in progress must not be captured.
        sync.scan(&bt656_field(&geometry(), 1, geometry().lines_per_field(), 0), &mut assembler);
        assert!(!assembler.has_active());
        assert!(frames.try_next_frame().is_none());

        sync.scan(&bt656_frame(&geometry(), 5), &mut assembler);
        let frame = frames.try_next_frame().expect("frame");
        assert_eq!(frame.status, FrameStatus::Done);
        assert_eq!(frame.payload(), expected_frame(&geometry(), 5).as_slice());
    }

    #[test]
    fn excess_line_bytes_are_dropped() {
        let (mut sync, mut assembler, _pool, mut frames) = setup(1);
        let g = geometry();
        let lines = g.lines_per_field();
        let mut stream = Vec::new();
        for field in 0..2 {
            for line in 0..lines {
                stream.extend(active_line(&g, field, line, 9, if line == 1 { 5 } else { 0 }));
            }
        }
        sync.scan(&stream, &mut assembler);

        let frame = frames.try_next_frame().expect("frame");
        assert_eq!(frame.status, FrameStatus::Done);
        assert_eq!(frame.payload(), expected_frame(&g, 9).as_slice());
        assert_eq!(assembler.stats().overrun_bytes, 10);
    }

    #[test]
    fn abort_returns_active_buffer_with_error() {
        let (mut sync, mut assembler, pool, mut frames) = setup(1);
        let half = bt656_field(&geometry(), 0, 2, 0);
        sync.scan(&half, &mut assembler);
        assert!(assembler.has_active());
        assert!(pool.is_busy());

        assert!(assembler.abort_active());
        assert!(!assembler.abort_active());
        let frame = frames.try_next_frame().expect("aborted");
        assert_eq!(frame.status, FrameStatus::Error);
        assert_eq!(frame.sequence, None);
        assert!(!pool.is_busy());
    }
}
