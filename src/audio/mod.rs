//! PCM audio path.
//!
//! Audio chunk payloads are written into a consumer-owned [`PcmRing`] by an
//! [`AudioResync`], which keeps the ring aligned on stereo frame boundaries
//! even when the USB stream drops or corrupts bytes. Period completions are
//! reported to a [`PeriodSink`].
//!
//! ## Usage Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::AtomicU64;
//! use easycap::audio::{AudioResync, PcmParams, PcmRing, PcmTrigger};
//!
//! let ring = PcmRing::new(PcmParams::default()).unwrap();
//! let periods = Arc::new(AtomicU64::new(0));
//!
//! let mut resync = AudioResync::new();
//! resync.attach(ring.clone(), periods);
//! ring.trigger(PcmTrigger::Start);
//!
//! // 24-bit samples in 32-bit slots: every fourth byte is zero.
//! let payload: Vec<u8> = (0..1020).map(|i| if i % 4 == 0 { 0 } else { 0x11 }).collect();
//! resync.process(&payload);
//! assert_eq!(ring.cursor().write_ptr, 1020);
//! ```

mod resync;
mod ring;

pub use resync::{AudioOutcome, AudioResync, PeriodSink};
pub use ring::{AudioCursor, PcmParams, PcmRing, PcmTrigger};
