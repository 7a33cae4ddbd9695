//! Video path: timing reference detection and frame assembly.
//!
//! [`SyncEngine`] splits the video substream into payload bytes and timing
//! reference codes and feeds both to a [`VideoSink`]. [`FrameAssembler`] is
//! the sink that weaves the payload into interlaced frames.
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use easycap::pool::{BufferPool, frame_channel};
//! use easycap::types::FrameGeometry;
//! use easycap::video::{FrameAssembler, SyncEngine};
//!
//! let geometry = FrameGeometry::new(4, 2);
//! let (sink, mut frames) = frame_channel();
//! let pool = Arc::new(BufferPool::new(sink, geometry));
//! pool.recycle(pool.allocate(geometry.expected_size()).unwrap()).unwrap();
//!
//! let mut sync = SyncEngine::new();
//! let mut assembler = FrameAssembler::new(pool, geometry);
//!
//! // One active line per field: SAV, four payload bytes, EAV.
//! sync.scan(&[0xff, 0x00, 0x00, 0x80, 1, 2, 3, 4, 0xff, 0x00, 0x00, 0x90], &mut assembler);
//! sync.scan(&[0xff, 0x00, 0x00, 0xc0, 5, 6, 7, 8, 0xff, 0x00, 0x00, 0xd0], &mut assembler);
//!
//! let frame = frames.try_next_frame().unwrap();
//! assert_eq!(frame.payload(), &[1, 2, 3, 4, 5, 6, 7, 8]);
//! ```

mod assembler;
mod sync;

pub use assembler::{AssemblerStats, FrameAssembler};
pub use sync::{SyncEngine, SyncState, VideoSink};
