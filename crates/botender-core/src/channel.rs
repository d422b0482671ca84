//! Latest-wins frame slot shared between the tick loop and the worker.
//!
//! A single fixed-size slot, not a queue: inference is far slower than the
//! capture tick, so any queue would grow without bound. A new write always
//! supersedes an unread frame, bounding both memory and staleness to one
//! slot. Freshness is tracked by an explicit flag rather than a value
//! sentinel, so an all-black real frame is still delivered.

use crate::types::{Frame, FrameShape};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SlotError {
    #[error("frame shape mismatch: slot is {expected_w}x{expected_h}, frame is {got_w}x{got_h}")]
    ShapeMismatch {
        expected_w: u32,
        expected_h: u32,
        got_w: u32,
        got_h: u32,
    },
}

struct SlotInner {
    data: Vec<u8>,
    /// Set on every write, cleared on take. Authoritative freshness signal.
    fresh: bool,
}

/// Single-slot latest-wins mailbox for frames.
///
/// The lock is held only for byte copies, never across a detection call.
pub struct FrameSlot {
    shape: FrameShape,
    inner: Mutex<SlotInner>,
}

impl FrameSlot {
    /// Allocate a zeroed slot sized exactly to one frame of `shape`.
    pub fn new(shape: FrameShape) -> Self {
        Self {
            shape,
            inner: Mutex::new(SlotInner {
                data: vec![0u8; shape.byte_len()],
                fresh: false,
            }),
        }
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    /// Copy `frame` into the slot, unconditionally overwriting any unread
    /// frame. No backpressure: correctness only requires that the worker
    /// eventually sees some recent frame, not every frame.
    pub fn write(&self, frame: &Frame) -> Result<(), SlotError> {
        if frame.shape != self.shape {
            return Err(SlotError::ShapeMismatch {
                expected_w: self.shape.width,
                expected_h: self.shape.height,
                got_w: frame.shape.width,
                got_h: frame.shape.height,
            });
        }
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.data.copy_from_slice(&frame.data);
        inner.fresh = true;
        Ok(())
    }

    /// Worker-side: copy the slot out and zero it, consuming the write.
    ///
    /// Returns `None` when nothing new was written since the last take.
    pub fn take(&self) -> Option<Frame> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if !inner.fresh {
            return None;
        }
        let frame = Frame {
            data: inner.data.clone(),
            shape: self.shape,
        };
        inner.data.fill(0);
        inner.fresh = false;
        Some(frame)
    }
}
