//! Control flags shared between the perception manager and the worker.

use std::sync::atomic::{AtomicBool, Ordering};

/// Stop and emotion-trigger flags.
///
/// The manager sets both; only the worker clears the emotion trigger, and
/// nothing ever clears stop. Setting the trigger while a window is already
/// sampling is a no-op by construction.
#[derive(Debug, Default)]
pub struct ControlSignals {
    stop: AtomicBool,
    emotion_trigger: AtomicBool,
}

impl ControlSignals {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cooperative worker shutdown. Observed once per worker loop
    /// iteration, so cancellation latency is bounded by one detection call.
    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop.load(Ordering::Acquire)
    }

    /// Arm an emotion-detection window. Idempotent while one is active.
    pub fn trigger_emotion(&self) {
        self.emotion_trigger.store(true, Ordering::Release);
    }

    pub fn emotion_triggered(&self) -> bool {
        self.emotion_trigger.load(Ordering::Acquire)
    }

    /// Worker-side: clear the trigger after a completed majority vote.
    pub fn clear_emotion_trigger(&self) {
        self.emotion_trigger.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signals_start_clear() {
        let s = ControlSignals::new();
        assert!(!s.stop_requested());
        assert!(!s.emotion_triggered());
    }

    #[test]
    fn test_trigger_is_idempotent() {
        let s = ControlSignals::new();
        s.trigger_emotion();
        s.trigger_emotion();
        assert!(s.emotion_triggered());
        s.clear_emotion_trigger();
        assert!(!s.emotion_triggered());
    }

    #[test]
    fn test_stop_latches() {
        let s = ControlSignals::new();
        s.request_stop();
        assert!(s.stop_requested());
    }
}
