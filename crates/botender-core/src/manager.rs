//! Perception manager — the pipeline's only surface toward the kiosk.
//!
//! Runs inside the caller's tick loop, once per tick, and never blocks:
//! frame writes go into the latest-wins slot, results are drained from the
//! channel opportunistically. Absence of a new result is a normal, silent
//! outcome.

use crate::capabilities::CapabilityFactory;
use crate::channel::{FrameSlot, SlotError};
use crate::signals::ControlSignals;
use crate::types::{DetectionResult, Frame, FrameShape};
use crate::worker::{self, WorkerConfig, WorkerHandle, WorkerMessage};
use std::sync::Arc;
use std::time::{Duration, Instant};

const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How a worker shutdown concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownOutcome {
    /// The worker observed the stop signal and exited within the grace period.
    Graceful,
    /// The worker did not exit in time and was abandoned.
    Forced,
}

/// Spawns and supervises the detection worker, feeds it frames, and exposes
/// a race-free view of face presence and the current emotion.
pub struct PerceptionManager {
    slot: Arc<FrameSlot>,
    signals: Arc<ControlSignals>,
    worker: Option<WorkerHandle>,
    ready: bool,
    current: Option<DetectionResult>,
    face_streak: u32,
    shutdown_grace: Duration,
}

impl PerceptionManager {
    /// Spawn the detection worker and return the managing handle.
    ///
    /// The worker loads its capabilities asynchronously; until its
    /// readiness signal arrives, [`run`](Self::run) skips frame writes.
    pub fn spawn(
        shape: FrameShape,
        factory: CapabilityFactory,
        worker_config: WorkerConfig,
        shutdown_grace: Duration,
    ) -> std::io::Result<Self> {
        let slot = Arc::new(FrameSlot::new(shape));
        let signals = Arc::new(ControlSignals::new());
        tracing::debug!(
            width = shape.width,
            height = shape.height,
            "spawning detection worker"
        );
        let handle = worker::spawn(factory, slot.clone(), signals.clone(), worker_config)?;
        Ok(Self::with_worker(slot, signals, handle, shutdown_grace))
    }

    /// Assemble a manager around an already-running worker. Exposed so
    /// tests can drive the manager against a mock worker thread.
    pub fn with_worker(
        slot: Arc<FrameSlot>,
        signals: Arc<ControlSignals>,
        worker: WorkerHandle,
        shutdown_grace: Duration,
    ) -> Self {
        Self {
            slot,
            signals,
            worker: Some(worker),
            ready: false,
            current: None,
            face_streak: 0,
            shutdown_grace,
        }
    }

    /// One tick of the pipeline: publish the current frame and drain any
    /// pending results. Never blocks beyond the slot's copy-only lock.
    pub fn run(&mut self, frame: &Frame) -> Result<(), SlotError> {
        if self.ready {
            self.slot.write(frame)?;
        }
        self.poll_results();
        Ok(())
    }

    fn poll_results(&mut self) {
        let Some(worker) = &self.worker else {
            return;
        };
        let receiver = worker.receiver().clone();
        // Drain everything available; results are applied in the order the
        // worker produced them so the streak counts every transition.
        while let Ok(msg) = receiver.try_recv() {
            match msg {
                WorkerMessage::Ready => {
                    tracing::info!("detection worker ready");
                    self.ready = true;
                }
                WorkerMessage::Result(result) if self.ready => self.apply_result(result),
                WorkerMessage::Result(_) => {
                    tracing::warn!("discarding result received before readiness signal");
                }
            }
        }
    }

    fn apply_result(&mut self, result: DetectionResult) {
        if result.face_present() {
            self.face_streak += 1;
        } else {
            self.face_streak = 0;
        }
        self.current = Some(result);
    }

    /// Latest cached result; `None` until the first one arrives. The
    /// manager is the sole writer — received results are never mutated.
    pub fn current_result(&self) -> Option<&DetectionResult> {
        self.current.as_ref()
    }

    /// True iff the latest result contains at least one face.
    pub fn face_present(&self) -> bool {
        self.current.as_ref().is_some_and(|r| r.face_present())
    }

    /// Consecutive ticks with at least one detected face.
    pub fn face_presence_counter(&self) -> u32 {
        self.face_streak
    }

    /// Whether the worker has signaled readiness.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Arm an emotion-detection window. A no-op while one is active.
    pub fn detect_emotion(&self) {
        if self.signals.emotion_triggered() {
            tracing::debug!("emotion window already active; trigger ignored");
            return;
        }
        tracing::debug!("emotion window triggered");
        self.signals.trigger_emotion();
    }

    /// Whether an emotion-detection window is still pending. Callers
    /// busy-poll this, then read the voted label off `current_result`.
    pub fn detects_emotion(&self) -> bool {
        self.signals.emotion_triggered()
    }

    /// Two-phase shutdown: request a cooperative stop, wait up to the
    /// grace period, then abandon the worker thread. The cooperative phase
    /// exists because the worker may be mid-inference and must not be
    /// discarded while holding the frame-slot lock.
    pub fn shutdown(&mut self) -> ShutdownOutcome {
        let Some(worker) = self.worker.take() else {
            return ShutdownOutcome::Graceful;
        };

        tracing::debug!("sending stop signal to detection worker");
        self.signals.request_stop();

        let deadline = Instant::now() + self.shutdown_grace;
        while !worker.is_finished() && Instant::now() < deadline {
            std::thread::sleep(SHUTDOWN_POLL_INTERVAL);
        }

        if worker.is_finished() {
            if worker.join().is_err() {
                tracing::warn!("detection worker panicked before exit");
            } else {
                tracing::debug!("detection worker stopped");
            }
            ShutdownOutcome::Graceful
        } else {
            tracing::warn!(
                grace_ms = self.shutdown_grace.as_millis() as u64,
                "detection worker did not stop within grace period; abandoning it"
            );
            drop(worker);
            ShutdownOutcome::Forced
        }
    }
}
