//! Circular PCM buffer shared between the producer and the audio consumer

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::wire::pcm;
use crate::{CaptureError, Result};

/// Period layout requested by the audio consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PcmParams {
    /// Frames per period (one frame = one stereo sample)
    pub period_frames: usize,
    /// Periods in the ring
    pub periods: usize,
}

impl Default for PcmParams {
    fn default() -> Self {
        Self { period_frames: 1024, periods: 4 }
    }
}

impl PcmParams {
    /// Bytes per frame across all channels.
    pub fn stride(&self) -> usize {
        (pcm::CHANNELS * pcm::SAMPLE_BITS / 8) as usize
    }

    /// Saturates on overflow so [`validate`](Self::validate) rejects it.
    pub fn period_bytes(&self) -> usize {
        self.period_frames.saturating_mul(self.stride())
    }

    pub fn buffer_bytes(&self) -> usize {
        self.period_bytes().saturating_mul(self.periods)
    }

    /// Check the layout against what the hardware can deliver.
    pub fn validate(&self) -> Result<()> {
        let period_bytes = self.period_bytes();
        if !(pcm::PERIOD_BYTES_MIN..=pcm::PERIOD_BYTES_MAX).contains(&period_bytes) {
            return Err(CaptureError::invalid_config(format!(
                "period of {} bytes outside {}..={}",
                period_bytes,
                pcm::PERIOD_BYTES_MIN,
                pcm::PERIOD_BYTES_MAX
            )));
        }
        if !(pcm::PERIODS_MIN..=pcm::PERIODS_MAX).contains(&self.periods)
            || !self.periods.is_power_of_two()
        {
            return Err(CaptureError::invalid_config(format!(
                "{} periods is not a power of two in {}..={}",
                self.periods,
                pcm::PERIODS_MIN,
                pcm::PERIODS_MAX
            )));
        }
        if self.buffer_bytes() > pcm::BUFFER_BYTES_MAX {
            return Err(CaptureError::invalid_config(format!(
                "ring of {} bytes exceeds {}",
                self.buffer_bytes(),
                pcm::BUFFER_BYTES_MAX
            )));
        }
        Ok(())
    }
}

/// Stream commands from the audio consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PcmTrigger {
    Start,
    Stop,
    PausePush,
    PauseRelease,
    Suspend,
    Resume,
}

impl PcmTrigger {
    fn capturing(self) -> bool {
        matches!(self, PcmTrigger::Start | PcmTrigger::PauseRelease | PcmTrigger::Resume)
    }
}

/// Write position and realignment state of the ring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AudioCursor {
    /// Next byte to write, always below the ring capacity
    pub write_ptr: usize,
    /// Offset of the first sample marker in the next delivery (0..stride/2)
    pub read_offset: usize,
    /// Channel samples written since the last period boundary
    pub complete_samples: usize,
    /// Bytes short of a whole channel sample, carried to the next write
    pub(crate) residual_bytes: usize,
    /// At least one delivery was written since `prepare`
    pub(crate) primed: bool,
}

pub(crate) struct RingState {
    pub(crate) area: Vec<u8>,
    pub(crate) cursor: AudioCursor,
    pub(crate) capturing: bool,
}

/// Circular PCM buffer owned by the audio consumer.
///
/// Cloning yields another handle to the same ring. The producer writes and
/// moves the cursor under the ring lock; the consumer takes the same lock to
/// read the playback position, so every critical section is a bounded copy.
#[derive(Clone)]
pub struct PcmRing {
    shared: Arc<Mutex<RingState>>,
    params: PcmParams,
}

impl PcmRing {
    /// Allocate a ring for the given period layout.
    pub fn new(params: PcmParams) -> Result<Self> {
        params.validate()?;

        let bytes = params.buffer_bytes();
        let mut area = Vec::new();
        area.try_reserve_exact(bytes)
            .map_err(|e| CaptureError::allocation_failed("pcm ring", bytes, e))?;
        area.resize(bytes, 0);

        debug!(
            bytes,
            period_frames = params.period_frames,
            periods = params.periods,
            "PCM ring allocated"
        );

        Ok(Self {
            shared: Arc::new(Mutex::new(RingState {
                area,
                cursor: AudioCursor::default(),
                capturing: false,
            })),
            params,
        })
    }

    pub fn params(&self) -> PcmParams {
        self.params
    }

    pub fn capacity(&self) -> usize {
        self.lock().area.len()
    }

    /// Reset the cursor before (re)starting capture.
    pub fn prepare(&self) {
        self.lock().cursor = AudioCursor::default();
    }

    /// Apply a stream command.
    pub fn trigger(&self, command: PcmTrigger) {
        let capturing = command.capturing();
        self.lock().capturing = capturing;
        debug!(?command, capturing, "PCM trigger");
    }

    pub fn is_capturing(&self) -> bool {
        self.lock().capturing
    }

    /// Playback position in frames.
    pub fn pointer(&self) -> usize {
        self.lock().cursor.write_ptr / self.params.stride()
    }

    pub fn cursor(&self) -> AudioCursor {
        self.lock().cursor
    }

    /// Run `f` over the ring contents while holding the lock.
    pub fn with_area<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.lock().area)
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, RingState> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for PcmRing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PcmRing")
            .field("params", &self.params)
            .field("cursor", &self.cursor())
            .finish()
    }
}
