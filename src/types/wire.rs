//! Bit-exact constants of the SMI2021 USB stream
//!
//! The device delivers isochronous packets made of 0x400-byte chunks. The
//! first four bytes of every chunk are a big-endian magic tag naming the
//! payload kind:
//!
//! - `0xaa 0xaa 0x00 0x00` - saa7113-compatible active video data (BT.656)
//! - `0xaa 0xaa 0x00 0x01` - 24-bit stereo PCM audio data

// Chunk framing
pub mod chunk {
    pub const SIZE: usize = 0x400;
    pub const HEADER_LEN: usize = 4;
    pub const PAYLOAD_LEN: usize = SIZE - HEADER_LEN;

    pub const VIDEO_MAGIC: u32 = 0xaaaa_0000;
    pub const AUDIO_MAGIC: u32 = 0xaaaa_0001;
}

// Timing reference codes (saa7113 datasheet, BT.656 XY byte)
pub mod trc {
    /// Leading byte of the 3-byte preamble.
    pub const PREAMBLE_FF: u8 = 0xff;
    /// Second and third preamble bytes.
    pub const PREAMBLE_00: u8 = 0x00;

    pub const EAV: u8 = 0x10; // H: end of active video
    pub const VBI: u8 = 0x20; // V: vertical blanking
    pub const FIELD_2: u8 = 0x40; // F: second field
    pub const MARKER: u8 = 0x80; // always set
    pub const RESERVED_MASK: u8 = 0x0f; // protection bits
}

// Video geometry
pub mod video {
    pub const BYTES_PER_LINE: usize = 1440;
    pub const NTSC_LINES: usize = 484;
    pub const PAL_LINES: usize = 576;

    pub const MIN_BUFFERS: usize = 4;
    pub const MAX_BUFFERS: usize = 16;
}

// PCM hardware description
pub mod pcm {
    pub const RATE: u32 = 48_000;
    pub const CHANNELS: u32 = 2;
    /// Each 24-bit sample travels in a 32-bit little-endian container.
    pub const SAMPLE_BITS: u32 = 32;

    pub const PERIOD_BYTES_MIN: usize = 992;
    pub const PERIOD_BYTES_MAX: usize = 15872;
    pub const PERIODS_MIN: usize = 1;
    pub const PERIODS_MAX: usize = 16;
    pub const BUFFER_BYTES_MAX: usize = 65280;

    /// Marker byte that precedes each 24-bit sample.
    pub const SAMPLE_MARKER: u8 = 0x00;
}

// USB product ids
pub mod usb {
    pub const VENDOR_ID: u16 = 0x1c88;
    pub const PRODUCT_DUAL_A: u16 = 0x003c;
    pub const PRODUCT_DUAL_B: u16 = 0x003d;
    pub const PRODUCT_QUAD_A: u16 = 0x003e;
    pub const PRODUCT_QUAD_B: u16 = 0x003f;
}
