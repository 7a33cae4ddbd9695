//! Frame buffer ownership between the consumer and the frame assembler.
//!
//! Every buffer lives in an arena slot of the [`BufferPool`] and is in
//! exactly one [`SlotState`] at a time:
//!
//! ```text
//!   allocate          recycle            acquire
//!  ─────────▶ WithConsumer ───▶ Queued ───▶ Active
//!                  ▲  │                       │
//!                  │  │ free                  │
//!                  │  ▼                       │
//!                  │ Free ─▶ (reused by allocate)
//!                  └──── release_done ────────┘
//!                  └──── abort_all (Queued) ──┘
//! ```
//!
//! The buffer's storage moves by value along these edges, so whoever holds
//! a [`FrameBuffer`] is its only owner. The slot table only records where
//! the buffer currently is, which lets the pool reject a buffer handed back
//! twice or a geometry change while buffers are claimed.
//!
//! Completed buffers leave through a [`FrameSink`]. The sink is always
//! invoked after the pool lock is released.
//!
//! ## Usage Example
//!
//! ```rust
//! use easycap::pool::{BufferPool, frame_channel};
//! use easycap::types::{FrameStatus, VideoStandard};
//!
//! let (sink, mut frames) = frame_channel();
//! let pool = BufferPool::new(sink, VideoStandard::Ntsc.geometry());
//!
//! let buffer = pool.allocate(pool.expected_size()).unwrap();
//! pool.recycle(buffer).unwrap();
//! assert_eq!(pool.queued_len(), 1);
//!
//! pool.abort_all();
//! let aborted = frames.try_next_frame().unwrap();
//! assert_eq!(aborted.status, FrameStatus::Error);
//! ```

use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use std::time::Instant;

use futures::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tracing::{debug, trace};

use crate::types::{FieldOrder, FrameGeometry, FrameStatus};
use crate::{CaptureError, Result};

/// Index of a buffer's arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(usize);

impl BufferHandle {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for BufferHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Output frame storage plus the assembly state that travels with it.
#[derive(Debug)]
pub struct FrameBuffer {
    handle: BufferHandle,
    data: Vec<u8>,
    /// Bytes written into the frame so far
    pub(crate) pos: usize,
    pub(crate) in_blank: bool,
    pub(crate) second_field: bool,
    /// Active-video start markers seen in the current field
    pub(crate) active_lines: usize,
}

impl FrameBuffer {
    fn new(handle: BufferHandle, data: Vec<u8>) -> Self {
        Self { handle, data, pos: 0, in_blank: true, second_field: false, active_lines: 0 }
    }

    pub fn handle(&self) -> BufferHandle {
        self.handle
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Bytes written by the assembler since the buffer was queued.
    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn is_second_field(&self) -> bool {
        self.second_field
    }

    fn reset(&mut self) {
        self.pos = 0;
        self.in_blank = true;
        self.second_field = false;
        self.active_lines = 0;
    }

    /// Store one byte at `offset` if it lies below `limit` and the storage.
    pub(crate) fn write_at(&mut self, offset: usize, byte: u8, limit: usize) -> bool {
        if offset >= limit {
            return false;
        }
        match self.data.get_mut(offset) {
            Some(slot) => {
                *slot = byte;
                self.pos += 1;
                true
            }
            None => false,
        }
    }
}

/// Where a slot's buffer currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    /// Held by the consumer, empty or completed
    WithConsumer,
    /// Waiting in the free list
    Queued,
    /// Being filled by the frame assembler
    Active,
    /// Retired; the next `allocate` reuses the slot
    Free,
}

impl SlotState {
    fn name(self) -> &'static str {
        match self {
            SlotState::WithConsumer => "with consumer",
            SlotState::Queued => "queued",
            SlotState::Active => "active",
            SlotState::Free => "free",
        }
    }

    fn is_claimed(self) -> bool {
        matches!(self, SlotState::Queued | SlotState::Active)
    }
}

/// A buffer handed back to the consumer.
#[derive(Debug)]
pub struct CompletedFrame {
    pub buffer: FrameBuffer,
    pub status: FrameStatus,
    /// Valid payload bytes; zero for failed frames
    pub bytes_used: usize,
    /// Frame sequence number, `None` for buffers aborted from the queue
    pub sequence: Option<u64>,
    pub timestamp: Instant,
    pub field_order: FieldOrder,
}

impl CompletedFrame {
    /// Payload bytes of the frame.
    pub fn payload(&self) -> &[u8] {
        &self.buffer.data()[..self.bytes_used.min(self.buffer.capacity())]
    }
}

/// Receiver of completed buffers.
pub trait FrameSink: Send + Sync {
    fn complete(&self, frame: CompletedFrame);
}

impl FrameSink for mpsc::UnboundedSender<CompletedFrame> {
    fn complete(&self, frame: CompletedFrame) {
        if let Err(err) = self.send(frame) {
            debug!(handle = %err.0.buffer.handle(), "Frame consumer gone, buffer dropped");
        }
    }
}

impl FrameSink for std::sync::mpsc::Sender<CompletedFrame> {
    fn complete(&self, frame: CompletedFrame) {
        if let Err(err) = self.send(frame) {
            debug!(handle = %err.0.buffer.handle(), "Frame consumer gone, buffer dropped");
        }
    }
}

/// Stream of completed frames paired with the sink from [`frame_channel`].
#[derive(Debug)]
pub struct FrameStream {
    inner: UnboundedReceiverStream<CompletedFrame>,
}

impl FrameStream {
    /// Take a completed frame without waiting.
    pub fn try_next_frame(&mut self) -> Option<CompletedFrame> {
        self.inner.as_mut().try_recv().ok()
    }
}

impl Stream for FrameStream {
    type Item = CompletedFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

/// Create an unbounded completion channel.
pub fn frame_channel() -> (mpsc::UnboundedSender<CompletedFrame>, FrameStream) {
    let (tx, rx) = mpsc::unbounded_channel();
    (tx, FrameStream { inner: UnboundedReceiverStream::new(rx) })
}

struct PoolState {
    slots: Vec<SlotState>,
    queue: VecDeque<FrameBuffer>,
    expected_size: usize,
    disconnected: bool,
}

impl PoolState {
    fn transition(
        &mut self,
        handle: BufferHandle,
        expected: SlotState,
        next: SlotState,
    ) -> Result<()> {
        let slot = self
            .slots
            .get_mut(handle.0)
            .ok_or(CaptureError::UnknownBuffer { handle: handle.0 })?;
        if *slot != expected {
            return Err(CaptureError::InvalidTransition {
                handle: handle.0,
                expected: expected.name(),
                actual: slot.name(),
            });
        }
        *slot = next;
        Ok(())
    }
}

/// Free list and completion handoff for frame buffers.
pub struct BufferPool {
    state: Mutex<PoolState>,
    sink: Arc<dyn FrameSink>,
}

impl BufferPool {
    pub fn new(sink: impl FrameSink + 'static, geometry: FrameGeometry) -> Self {
        Self::with_sink(Arc::new(sink), geometry)
    }

    pub fn with_sink(sink: Arc<dyn FrameSink>, geometry: FrameGeometry) -> Self {
        Self {
            state: Mutex::new(PoolState {
                slots: Vec::new(),
                queue: VecDeque::new(),
                expected_size: geometry.expected_size(),
                disconnected: false,
            }),
            sink,
        }
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Allocate a zeroed buffer of `capacity` bytes owned by the consumer.
    pub fn allocate(&self, capacity: usize) -> Result<FrameBuffer> {
        let mut data = Vec::new();
        data.try_reserve_exact(capacity)
            .map_err(|e| CaptureError::allocation_failed("frame buffer", capacity, e))?;
        data.resize(capacity, 0);

        let mut state = self.lock();
        let handle = match state.slots.iter().position(|s| *s == SlotState::Free) {
            Some(index) => {
                state.slots[index] = SlotState::WithConsumer;
                BufferHandle(index)
            }
            None => {
                state.slots.push(SlotState::WithConsumer);
                BufferHandle(state.slots.len() - 1)
            }
        };
        drop(state);

        debug!(%handle, capacity, "Frame buffer allocated");
        Ok(FrameBuffer::new(handle, data))
    }

    /// Release a consumer-held buffer for good, freeing its slot.
    pub fn free(&self, buffer: FrameBuffer) -> Result<()> {
        let handle = buffer.handle;
        self.lock().transition(handle, SlotState::WithConsumer, SlotState::Free)?;
        debug!(%handle, capacity = buffer.capacity(), "Frame buffer freed");
        Ok(())
    }

    /// Hand an empty buffer to the pool.
    ///
    /// Buffers too small for the current geometry, and every buffer after
    /// a disconnect, come straight back with [`FrameStatus::Error`].
    pub fn recycle(&self, mut buffer: FrameBuffer) -> Result<()> {
        let handle = buffer.handle;
        let mut state = self.lock();
        state.transition(handle, SlotState::WithConsumer, SlotState::WithConsumer)?;

        buffer.reset();
        if state.disconnected || buffer.capacity() < state.expected_size {
            let expected = state.expected_size;
            drop(state);
            debug!(%handle, capacity = buffer.capacity(), expected, "Buffer returned unused");
            self.sink.complete(Self::completion(buffer, FrameStatus::Error, None));
            return Ok(());
        }

        state.slots[handle.0] = SlotState::Queued;
        state.queue.push_back(buffer);
        trace!(%handle, queued = state.queue.len(), "Buffer queued");
        Ok(())
    }

    /// Claim the oldest queued buffer for assembly.
    pub fn acquire(&self) -> Option<FrameBuffer> {
        let mut state = self.lock();
        let buffer = state.queue.pop_front()?;
        state.slots[buffer.handle.0] = SlotState::Active;
        Some(buffer)
    }

    /// Hand a finalized buffer to the consumer.
    pub fn release_done(
        &self,
        buffer: FrameBuffer,
        status: FrameStatus,
        sequence: Option<u64>,
    ) -> Result<()> {
        self.lock().transition(buffer.handle, SlotState::Active, SlotState::WithConsumer)?;
        self.sink.complete(Self::completion(buffer, status, sequence));
        Ok(())
    }

    /// Return every queued buffer to the consumer with an error status.
    pub fn abort_all(&self) -> usize {
        let aborted: Vec<FrameBuffer> = {
            let mut state = self.lock();
            let drained: Vec<FrameBuffer> = state.queue.drain(..).collect();
            for buffer in &drained {
                state.slots[buffer.handle.0] = SlotState::WithConsumer;
            }
            drained
        };

        let count = aborted.len();
        for buffer in aborted {
            debug!(handle = %buffer.handle, "Buffer aborted");
            self.sink.complete(Self::completion(buffer, FrameStatus::Error, None));
        }
        count
    }

    /// Mark the device gone; queued buffers are aborted and later
    /// recycles bounce straight back.
    pub fn disconnect(&self) -> usize {
        self.lock().disconnected = true;
        self.abort_all()
    }

    pub fn is_disconnected(&self) -> bool {
        self.lock().disconnected
    }

    /// Any buffer queued or being filled.
    pub fn is_busy(&self) -> bool {
        self.lock().slots.iter().any(|s| s.is_claimed())
    }

    pub fn expected_size(&self) -> usize {
        self.lock().expected_size
    }

    /// Change the size a buffer needs to hold a complete frame.
    pub fn set_expected_size(&self, size: usize) -> Result<()> {
        let mut state = self.lock();
        if state.slots.iter().any(|s| s.is_claimed()) {
            return Err(CaptureError::busy("frame size"));
        }
        state.expected_size = size;
        Ok(())
    }

    pub fn slot_state(&self, handle: BufferHandle) -> Option<SlotState> {
        self.lock().slots.get(handle.0).copied()
    }

    pub fn queued_len(&self) -> usize {
        self.lock().queue.len()
    }

    /// Buffers allocated and not yet freed.
    pub fn len(&self) -> usize {
        self.lock().slots.iter().filter(|s| **s != SlotState::Free).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn completion(
        buffer: FrameBuffer,
        status: FrameStatus,
        sequence: Option<u64>,
    ) -> CompletedFrame {
        let bytes_used = if status.is_ok() { buffer.pos } else { 0 };
        CompletedFrame {
            buffer,
            status,
            bytes_used,
            sequence,
            timestamp: Instant::now(),
            field_order: FieldOrder::Interlaced,
        }
    }
}

impl std::fmt::Debug for BufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("BufferPool")
            .field("slots", &state.slots)
            .field("queued", &state.queue.len())
            .field("expected_size", &state.expected_size)
            .field("disconnected", &state.disconnected)
            .finish()
    }
}
