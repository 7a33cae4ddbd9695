//! Core types shared by the demultiplexer, the frame assembler and the audio path.
//!
//! ## Overview
//!
//! - [`Trc`] wraps the BT.656 timing reference byte with named predicates
//! - [`VideoStandard`] and [`FrameGeometry`] describe the interlaced output frame
//! - [`DeviceModel`] and [`VideoInput`] list the analog inputs per board variant
//! - [`FrameStatus`] is the completion result of a frame buffer
//! - [`TransferStatus`] and [`TransferAction`] describe the transport boundary
//! - [`wire`] holds the bit-exact constants of the USB stream
//!
//! ## Usage Example
//!
//! ```rust
//! use easycap::types::{Trc, VideoStandard};
//!
//! let geometry = VideoStandard::Pal.geometry();
//! assert_eq!(geometry.expected_size(), 1440 * 576);
//!
//! let sav = Trc::new(0x80);
//! assert!(sav.opens_frame());
//! ```

mod frame;
mod input;
mod standard;
mod transfer;
mod trc;
pub mod wire;

pub use frame::FrameStatus;
pub use input::{DeviceModel, InputKind, VideoInput};
pub use standard::{
    CaptureFormat, FieldOrder, FrameGeometry, PixelFormat, VideoStandard, negotiate_buffer_count,
};
pub use transfer::{TransferAction, TransferStatus};
pub use trc::Trc;
