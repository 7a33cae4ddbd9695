//! Completion status reported for every finished frame buffer

use serde::{Deserialize, Serialize};

/// Result attached to a buffer when it leaves the assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameStatus {
    /// The frame reached its expected size.
    Done,
    /// Underrun, corruption, or the stream stopped before completion.
    Error,
}

impl FrameStatus {
    pub fn is_ok(self) -> bool {
        matches!(self, FrameStatus::Done)
    }
}
