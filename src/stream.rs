//! Per-stream capture context.
//!
//! [`CaptureStream`] owns everything the delivery path mutates: the sync
//! engine, the frame assembler, the audio resynchronizer and the counters.
//! The transport hands it one delivery at a time through
//! [`CaptureStream::process_delivery`] (or a whole transfer through
//! [`CaptureStream::handle_transfer`]); stream control runs on the same
//! `&mut` context, so none of this state needs a lock. Only the buffer pool
//! and the PCM ring are shared with consumers.
//!
//! ## Usage Example
//!
//! ```rust
//! use easycap::{CaptureConfig, CaptureStream, DeliveryOutcome};
//!
//! let (mut stream, mut frames) = CaptureStream::with_channel(CaptureConfig::default()).unwrap();
//! let pool = stream.pool().clone();
//! for _ in 0..4 {
//!     pool.recycle(pool.allocate(pool.expected_size()).unwrap()).unwrap();
//! }
//!
//! stream.start_stream().unwrap();
//! let outcome = stream.process_delivery(&[0u8; 1023]);
//! assert_eq!(outcome, DeliveryOutcome::Dropped { len: 1023 });
//!
//! // Stopping hands every queued buffer back with an error status.
//! assert_eq!(stream.stop_stream(), 4);
//! assert!(frames.try_next_frame().is_some());
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, trace, warn};

use crate::audio::{AudioCursor, AudioOutcome, AudioResync, PcmRing, PeriodSink};
use crate::chunk::{self, ChunkKind};
use crate::config::CaptureConfig;
use crate::pool::{BufferPool, FrameStream, frame_channel};
use crate::ratelimit::{RateCheck, RateLimiter};
use crate::types::{
    CaptureFormat, FrameGeometry, TransferAction, TransferStatus, VideoInput, VideoStandard,
};
use crate::types::wire::video;
use crate::video::{FrameAssembler, SyncEngine, SyncState};
use crate::{CaptureError, Result};

/// What happened to one transport delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Every chunk was routed.
    Processed { video: usize, audio: usize, unknown: usize },
    /// Length was not a whole number of chunks; nothing was processed.
    Dropped { len: usize },
    /// The stream is stopped; the delivery was ignored.
    NotStreaming,
}

/// Counters for one stream, reset by nothing but a new stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub deliveries: u64,
    pub dropped_deliveries: u64,
    pub video_chunks: u64,
    pub audio_chunks: u64,
    pub unknown_chunks: u64,
    pub transfer_errors: u64,
    pub frames_completed: u64,
    pub frames_failed: u64,
    pub starved_frames: u64,
    pub overrun_bytes: u64,
    pub audio_periods: u64,
    pub audio_realignments: u64,
    pub audio_bytes_dropped: u64,
    pub suppressed_warnings: u64,
}

#[derive(Debug, Default)]
struct DeliveryCounters {
    deliveries: u64,
    dropped: u64,
    video: u64,
    audio: u64,
    unknown: u64,
    transfer_errors: u64,
    periods: u64,
}

/// Single per-stream context for the capture pipeline.
#[derive(Debug)]
pub struct CaptureStream {
    config: CaptureConfig,
    pool: Arc<BufferPool>,
    sync: SyncEngine,
    assembler: FrameAssembler,
    audio: AudioResync,
    limiter: RateLimiter,
    counters: DeliveryCounters,
    streaming: bool,
    connected: bool,
}

impl CaptureStream {
    /// Build a stream around a consumer-provided pool.
    pub fn new(config: CaptureConfig, pool: Arc<BufferPool>) -> Result<Self> {
        config.validate()?;
        let geometry = config.standard.geometry();
        pool.set_expected_size(geometry.expected_size())?;

        debug!(
            standard = ?config.standard,
            model = ?config.model,
            input = config.input,
            "Capture stream created"
        );

        Ok(Self {
            assembler: FrameAssembler::new(pool.clone(), geometry),
            limiter: config.diagnostics.limiter(),
            config,
            pool,
            sync: SyncEngine::new(),
            audio: AudioResync::new(),
            counters: DeliveryCounters::default(),
            streaming: false,
            connected: true,
        })
    }

    /// Build a stream whose completions arrive on a [`FrameStream`].
    pub fn with_channel(config: CaptureConfig) -> Result<(Self, FrameStream)> {
        let (sink, frames) = frame_channel();
        let pool = Arc::new(BufferPool::new(sink, config.standard.geometry()));
        Ok((Self::new(config, pool)?, frames))
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<BufferPool> {
        &self.pool
    }

    pub fn geometry(&self) -> FrameGeometry {
        self.assembler.geometry()
    }

    pub fn format(&self) -> CaptureFormat {
        self.geometry().format()
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn sync_state(&self) -> SyncState {
        self.sync.state()
    }

    /// Cursor of the attached PCM ring, if any.
    pub fn audio_cursor(&self) -> Option<AudioCursor> {
        self.audio.ring().map(PcmRing::cursor)
    }

    /// Route audio chunks into `ring`, reporting periods to `sink`.
    pub fn attach_audio(&mut self, ring: PcmRing, sink: Arc<dyn PeriodSink>) {
        debug!(?ring, "PCM ring attached");
        self.audio.attach(ring, sink);
    }

    pub fn detach_audio(&mut self) -> Option<PcmRing> {
        self.audio.detach()
    }

    pub fn start_stream(&mut self) -> Result<()> {
        if !self.connected {
            return Err(CaptureError::NoDevice);
        }
        if self.streaming {
            return Err(CaptureError::AlreadyStreaming);
        }

        self.sync.reset();
        self.audio.reset();
        self.assembler.reset_sequence();
        self.streaming = true;

        info!(standard = ?self.config.standard, input = self.input().name, "Streaming started");
        Ok(())
    }

    /// Stop processing and hand every claimed buffer back with an error.
    ///
    /// Safe to call repeatedly. Returns the number of buffers aborted.
    pub fn stop_stream(&mut self) -> usize {
        let mut aborted = self.pool.abort_all();
        if self.assembler.abort_active() {
            aborted += 1;
        }
        self.sync.reset();
        self.audio.reset();

        if std::mem::replace(&mut self.streaming, false) {
            info!(aborted, "Streaming stopped");
        }
        aborted
    }

    /// The device is gone: stop and refuse further buffers and starts.
    pub fn disconnect(&mut self) {
        self.stop_stream();
        self.pool.disconnect();
        self.connected = false;
        info!("Capture device disconnected");
    }

    /// Change the number of lines per frame.
    ///
    /// Heights must be even and at most the PAL line count. Rejected with
    /// [`CaptureError::Busy`] while any buffer is queued or being filled.
    pub fn set_frame_height(&mut self, lines: usize) -> Result<()> {
        if lines == 0 || lines % 2 != 0 || lines > video::PAL_LINES {
            return Err(CaptureError::invalid_config(format!(
                "frame height {lines} must be an even line count in 2..={}",
                video::PAL_LINES
            )));
        }
        if self.assembler.has_active() {
            return Err(CaptureError::busy("frame height"));
        }

        let geometry = FrameGeometry::new(self.geometry().line_width, lines);
        self.pool.set_expected_size(geometry.expected_size())?;
        self.assembler.set_geometry(geometry);

        info!(lines, "Frame height changed");
        Ok(())
    }

    /// Switch the analog standard; a no-op if it is already selected.
    pub fn set_standard(&mut self, standard: VideoStandard) -> Result<()> {
        if standard == self.config.standard {
            return Ok(());
        }
        self.set_frame_height(standard.frame_height())?;
        self.config.standard = standard;
        Ok(())
    }

    pub fn inputs(&self) -> &'static [VideoInput] {
        self.config.model.inputs()
    }

    pub fn input(&self) -> &'static VideoInput {
        let inputs = self.inputs();
        &inputs[self.config.input.min(inputs.len() - 1)]
    }

    pub fn set_input(&mut self, index: usize) -> Result<()> {
        let input = self
            .config
            .model
            .input(index)
            .ok_or(CaptureError::InvalidInput { index, available: self.inputs().len() })?;
        self.config.input = index;
        info!(index, name = input.name, "Input selected");
        Ok(())
    }

    /// Demultiplex one transport delivery.
    pub fn process_delivery(&mut self, data: &[u8]) -> DeliveryOutcome {
        if !self.streaming {
            return DeliveryOutcome::NotStreaming;
        }
        self.counters.deliveries += 1;

        let Some(chunks) = chunk::split(data) else {
            self.counters.dropped += 1;
            if let RateCheck::Allowed { suppressed } = self.limiter.check() {
                warn!(
                    len = data.len(),
                    suppressed,
                    "Delivery is not a whole number of chunks, dropped"
                );
            }
            return DeliveryOutcome::Dropped { len: data.len() };
        };

        let (mut video, mut audio, mut unknown) = (0, 0, 0);
        for chunk in chunks {
            match chunk.kind {
                ChunkKind::Video => {
                    video += 1;
                    self.sync.scan(chunk.payload, &mut self.assembler);
                }
                ChunkKind::Audio => {
                    audio += 1;
                    if let AudioOutcome::Written { periods, .. } =
                        self.audio.process(chunk.payload)
                    {
                        self.counters.periods += periods as u64;
                    }
                }
                ChunkKind::Unknown(magic) => {
                    unknown += 1;
                    trace!("Unknown chunk {magic:#010x} skipped");
                }
            }
        }

        self.counters.video += video as u64;
        self.counters.audio += audio as u64;
        self.counters.unknown += unknown as u64;
        DeliveryOutcome::Processed { video, audio, unknown }
    }

    /// Process a retired transfer, one delivery per packet.
    pub fn handle_transfer<'a, I>(&mut self, status: TransferStatus, packets: I) -> TransferAction
    where
        I: IntoIterator<Item = &'a [u8]>,
    {
        match status {
            TransferStatus::Completed => {}
            status if status.is_teardown() => {
                trace!(?status, "Transfer retired");
                return TransferAction::Retire;
            }
            status => {
                self.counters.transfer_errors += 1;
                warn!(?status, "Transfer error");
                return TransferAction::Retire;
            }
        }

        if !self.streaming {
            return TransferAction::Retire;
        }
        for packet in packets {
            self.process_delivery(packet);
        }
        TransferAction::Resubmit
    }

    pub fn stats(&self) -> StreamStats {
        let video = self.assembler.stats();
        StreamStats {
            deliveries: self.counters.deliveries,
            dropped_deliveries: self.counters.dropped,
            video_chunks: self.counters.video,
            audio_chunks: self.counters.audio,
            unknown_chunks: self.counters.unknown,
            transfer_errors: self.counters.transfer_errors,
            frames_completed: video.frames_completed,
            frames_failed: video.frames_failed,
            starved_frames: video.starved_frames,
            overrun_bytes: video.overrun_bytes,
            audio_periods: self.counters.periods,
            audio_realignments: self.audio.realignments(),
            audio_bytes_dropped: self.audio.bytes_dropped(),
            suppressed_warnings: self.limiter.total_suppressed(),
        }
    }
}
