//! Demultiplexer for SMI2021-based EasyCap USB capture devices.
//!
//! The device interleaves BT.656 video and 24-bit stereo PCM audio in
//! fixed-size chunks. This crate turns the raw transport deliveries back
//! into interlaced frames and an aligned PCM ring, tolerating dropped and
//! corrupted bytes without losing lock for more than one frame.
//!
//! # Features
//!
//! - **Chunk Classifier**: routes each 1024-byte chunk by its magic tag
//! - **Video Sync Engine**: finds timing reference codes, replays false preambles
//! - **Frame Assembler**: weaves both fields into consumer-provided buffers
//! - **Buffer Pool**: single-owner buffer handoff, never blocks the producer
//! - **Audio Resynchronizer**: keeps the PCM ring on frame boundaries across tears
//!
//! The USB transport itself is not part of this crate. Whatever submits
//! the isochronous transfers hands each completed one to
//! [`CaptureStream::handle_transfer`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use easycap::{CaptureConfig, CaptureStream, TransferStatus};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> easycap::Result<()> {
//!     let config = CaptureConfig::from_path("easycap.yaml")?;
//!     let (mut stream, mut frames) = CaptureStream::with_channel(config)?;
//!
//!     let pool = stream.pool().clone();
//!     for _ in 0..4 {
//!         pool.recycle(pool.allocate(pool.expected_size())?)?;
//!     }
//!     stream.start_stream()?;
//!
//!     // Called from the transfer completion path.
//!     let packet = vec![0u8; 3 * 1024];
//!     stream.handle_transfer(TransferStatus::Completed, [packet.as_slice()]);
//!
//!     while let Some(frame) = frames.next().await {
//!         println!("frame {:?}: {:?}, {} bytes", frame.sequence, frame.status, frame.bytes_used);
//!         pool.recycle(frame.buffer)?;
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Pipeline stages
pub mod audio;
pub mod chunk;
pub mod pool;
pub mod video;

// Stream context and its configuration
pub mod config;
pub mod ratelimit;
pub mod stream;

// Core exports
pub use error::*;
pub use types::*;

// Main API exports
pub use audio::{AudioOutcome, AudioResync, PcmParams, PcmRing, PcmTrigger, PeriodSink};
pub use config::{CaptureConfig, DiagnosticsConfig};
pub use pool::{
    BufferHandle, BufferPool, CompletedFrame, FrameBuffer, FrameSink, FrameStream, SlotState,
    frame_channel,
};
pub use stream::{CaptureStream, DeliveryOutcome, StreamStats};
pub use video::{FrameAssembler, SyncEngine, VideoSink};
