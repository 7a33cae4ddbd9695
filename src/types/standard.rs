//! Analog video standards and the frame geometry they imply

use serde::{Deserialize, Serialize};

use super::wire::video;

/// Analog television standard decoded by the capture chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoStandard {
    /// 525 lines / 60 Hz
    #[default]
    Ntsc,
    /// 625 lines / 50 Hz
    Pal,
}

impl VideoStandard {
    /// Captured frame height in lines.
    pub fn frame_height(self) -> usize {
        match self {
            VideoStandard::Ntsc => video::NTSC_LINES,
            VideoStandard::Pal => video::PAL_LINES,
        }
    }

    pub fn geometry(self) -> FrameGeometry {
        FrameGeometry::new(video::BYTES_PER_LINE, self.frame_height())
    }
}

/// Layout of one interlaced output frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameGeometry {
    /// Bytes per output line (two bytes per UYVY pixel)
    pub line_width: usize,
    /// Lines per frame, both fields together
    pub height: usize,
}

impl FrameGeometry {
    pub fn new(line_width: usize, height: usize) -> Self {
        Self { line_width, height }
    }

    /// Bytes a frame must contain to be complete.
    pub fn expected_size(&self) -> usize {
        self.line_width * self.height
    }

    pub fn lines_per_field(&self) -> usize {
        self.height / 2
    }

    /// Pixel width of the packed UYVY image.
    pub fn pixel_width(&self) -> usize {
        self.line_width / 2
    }

    /// Capture format advertised to consumers.
    pub fn format(&self) -> CaptureFormat {
        CaptureFormat {
            width: self.pixel_width(),
            height: self.height,
            bytes_per_line: self.line_width,
            image_size: self.expected_size(),
            pixel_format: PixelFormat::Uyvy,
            field_order: FieldOrder::Interlaced,
        }
    }
}

impl Default for FrameGeometry {
    fn default() -> Self {
        VideoStandard::default().geometry()
    }
}

/// Pixel layout of captured frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// 16bpp packed 4:2:2, U Y0 V Y1
    Uyvy,
}

/// How fields are arranged inside a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldOrder {
    /// Lines of both fields woven together, field one on even rows
    Interlaced,
}

/// Format description derived from [`FrameGeometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureFormat {
    pub width: usize,
    pub height: usize,
    pub bytes_per_line: usize,
    pub image_size: usize,
    pub pixel_format: PixelFormat,
    pub field_order: FieldOrder,
}

/// Clamp a requested buffer count to what the stream supports and report
/// the size each buffer needs.
pub fn negotiate_buffer_count(requested: usize, geometry: &FrameGeometry) -> (usize, usize) {
    (requested.clamp(video::MIN_BUFFERS, video::MAX_BUFFERS), geometry.expected_size())
}
