//! Stand-in for the excluded capture surface.
//!
//! The capture contract is only "a current-frame accessor returning the
//! same fixed shape every call, zero before the first capture". This
//! synthetic source animates a gradient so the pipeline has changing
//! input without a camera.

use botender_core::types::{Frame, FrameShape};

pub struct SyntheticFrameSource {
    frame: Frame,
    tick: u64,
}

impl SyntheticFrameSource {
    pub fn new(shape: FrameShape) -> Self {
        Self {
            frame: Frame::black(shape),
            tick: 0,
        }
    }

    /// Advance the animation one tick and return the current frame.
    pub fn capture(&mut self) -> &Frame {
        let width = self.frame.width() as usize;
        let phase = self.tick as usize;
        for (i, px) in self.frame.data.chunks_exact_mut(3).enumerate() {
            let x = i % width;
            let y = i / width;
            px[0] = ((x + phase) & 0xff) as u8;
            px[1] = ((y + phase / 2) & 0xff) as u8;
            px[2] = ((x + y) & 0xff) as u8;
        }
        self.tick = self.tick.wrapping_add(1);
        &self.frame
    }
}
