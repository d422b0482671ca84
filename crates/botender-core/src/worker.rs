//! Detection worker — a dedicated OS thread owning the ML capabilities.
//!
//! The thread loads the capabilities, signals readiness once, then loops:
//! drain the latest frame, detect faces, advance the emotion-detection
//! window when triggered, and push a result snapshot over the channel.
//! Inference latency on this thread can never stall the caller's tick loop.

use crate::capabilities::{
    Capabilities, CapabilityError, CapabilityFactory, EmotionClassifier, FaceDetector,
};
use crate::channel::FrameSlot;
use crate::signals::ControlSignals;
use crate::types::{DetectionResult, EmotionLabel, Frame};
use crossbeam_channel::{Receiver, Sender};
use std::sync::Arc;
use std::time::Duration;

const WORKER_THREAD_NAME: &str = "botender-detection";

/// Tuning for the worker loop and the emotion-detection window.
#[derive(Debug, Clone, Copy)]
pub struct WorkerConfig {
    /// Labels collected per emotion-detection window before the vote.
    pub sample_count: usize,
    /// Sample every n-th processed frame while a window is active (>= 1).
    pub frame_skip: u32,
    /// Bounded idle backoff when no new frame is available. Kept short so
    /// the stop signal stays responsive.
    pub idle_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            sample_count: 5,
            frame_skip: 3,
            idle_backoff: Duration::from_millis(10),
        }
    }
}

/// Messages flowing worker → manager. FIFO by construction: single
/// producer, single consumer.
#[derive(Debug, Clone)]
pub enum WorkerMessage {
    /// Sent exactly once, after capability loading succeeds. Channel
    /// activity before this is invalid.
    Ready,
    /// One result snapshot per processed frame.
    Result(DetectionResult),
}

/// Join handle plus the receiving end of the result channel.
pub struct WorkerHandle {
    join: std::thread::JoinHandle<()>,
    rx: Receiver<WorkerMessage>,
}

impl WorkerHandle {
    /// Pair a worker thread with its result channel. Exposed so tests can
    /// stand up mock workers against the real manager.
    pub fn new(join: std::thread::JoinHandle<()>, rx: Receiver<WorkerMessage>) -> Self {
        Self { join, rx }
    }

    pub fn receiver(&self) -> &Receiver<WorkerMessage> {
        &self.rx
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub fn join(self) -> std::thread::Result<()> {
        self.join.join()
    }
}

/// Spawn the detection worker.
///
/// The capability factory runs on the worker thread; the readiness message
/// is sent only after it returns. A factory or detection error terminates
/// the worker (logged, not recovered in-process) — the manager's shutdown
/// path is the only recovery mechanism.
pub fn spawn(
    factory: CapabilityFactory,
    slot: Arc<FrameSlot>,
    signals: Arc<ControlSignals>,
    config: WorkerConfig,
) -> std::io::Result<WorkerHandle> {
    let (tx, rx) = crossbeam_channel::unbounded::<WorkerMessage>();

    let join = std::thread::Builder::new()
        .name(WORKER_THREAD_NAME.into())
        .spawn(move || {
            let caps = match factory() {
                Ok(caps) => caps,
                Err(e) => {
                    tracing::error!(error = %e, "capability loading failed; worker exiting");
                    return;
                }
            };
            tracing::info!("detection capabilities loaded");

            if tx.send(WorkerMessage::Ready).is_err() {
                tracing::warn!("manager dropped before readiness; worker exiting");
                return;
            }

            if let Err(e) = run_loop(caps, &slot, &signals, &tx, config) {
                tracing::error!(error = %e, "detection failed; worker exiting");
            }
        })?;

    Ok(WorkerHandle::new(join, rx))
}

fn run_loop(
    mut caps: Capabilities,
    slot: &FrameSlot,
    signals: &ControlSignals,
    tx: &Sender<WorkerMessage>,
    config: WorkerConfig,
) -> Result<(), CapabilityError> {
    let mut result = DetectionResult::default();
    let mut window = EmotionWindow::new(config.sample_count, config.frame_skip.max(1));

    loop {
        if signals.stop_requested() {
            tracing::debug!("stop signal observed; worker loop exiting");
            return Ok(());
        }

        let Some(frame) = slot.take() else {
            std::thread::sleep(config.idle_backoff);
            continue;
        };

        result.faces = caps.detector.detect_faces(&frame)?;

        if signals.emotion_triggered() {
            if let Some(vote) = window.advance(&mut caps, &frame, &mut result)? {
                tracing::info!(emotion = %vote, "emotion window completed");
                result.emotion = vote;
                result.features.clear();
                signals.clear_emotion_trigger();
            }
        }

        if tx.send(WorkerMessage::Result(result.clone())).is_err() {
            tracing::debug!("result channel closed; worker loop exiting");
            return Ok(());
        }
    }
}

/// The on-demand sampling-then-majority-vote cycle.
///
/// While the trigger flag is set, every `frame_skip`-th processed frame
/// with at least one face contributes one label; no-face frames contribute
/// nothing and do not consume the sample budget. Reaching `sample_count`
/// labels completes the window.
struct EmotionWindow {
    sample_count: usize,
    frame_skip: u32,
    ticks: u32,
    labels: Vec<EmotionLabel>,
}

impl EmotionWindow {
    fn new(sample_count: usize, frame_skip: u32) -> Self {
        Self {
            sample_count,
            frame_skip,
            ticks: 0,
            labels: Vec::with_capacity(sample_count),
        }
    }

    /// Advance by one processed frame. Returns the voted label when the
    /// sample budget is reached, resetting the window for the next trigger.
    fn advance(
        &mut self,
        caps: &mut Capabilities,
        frame: &Frame,
        result: &mut DetectionResult,
    ) -> Result<Option<EmotionLabel>, CapabilityError> {
        let sample_now = self.ticks % self.frame_skip == 0;
        self.ticks = self.ticks.wrapping_add(1);

        if sample_now && !result.faces.is_empty() {
            result.features = caps.classifier.extract_features(frame, &result.faces)?;
            let label = caps
                .classifier
                .classify(frame, &result.faces, &result.features)?;
            tracing::debug!(label = %label, collected = self.labels.len() + 1, "emotion sample");
            self.labels.push(label);
        }

        if self.labels.len() >= self.sample_count {
            let vote = majority_vote(&self.labels);
            self.labels.clear();
            self.ticks = 0;
            return Ok(Some(vote));
        }
        Ok(None)
    }
}

/// Majority vote over collected labels.
///
/// Ties break toward the label that first reached the winning count in
/// buffer order. An empty buffer votes neutral.
fn majority_vote(labels: &[EmotionLabel]) -> EmotionLabel {
    let mut counts = [0u32; EmotionLabel::ALL.len()];
    let mut best = EmotionLabel::Neutral;
    let mut best_count = 0u32;

    for &label in labels {
        let c = &mut counts[label.index()];
        *c += 1;
        if *c > best_count {
            best_count = *c;
            best = label;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{ScriptedClassifier, ScriptedDetector};
    use crate::types::{BoundingBox, Frame, FrameShape};

    fn face() -> BoundingBox {
        BoundingBox {
            x_min: 0.0,
            y_min: 0.0,
            x_max: 10.0,
            y_max: 10.0,
            confidence: 0.99,
        }
    }

    fn caps_with_labels(labels: &[EmotionLabel]) -> Capabilities {
        Capabilities {
            detector: Box::new(ScriptedDetector::always(vec![face()])),
            classifier: Box::new(ScriptedClassifier::new(labels.to_vec())),
        }
    }

    #[test]
    fn test_majority_vote_empty_is_neutral() {
        assert_eq!(majority_vote(&[]), EmotionLabel::Neutral);
    }

    #[test]
    fn test_majority_vote_simple_majority() {
        use EmotionLabel::*;
        assert_eq!(majority_vote(&[Happy, Happy, Sad]), Happy);
        assert_eq!(majority_vote(&[Sad, Angry, Sad]), Sad);
    }

    #[test]
    fn test_majority_vote_tie_breaks_first_reached_max() {
        use EmotionLabel::*;
        // Happy reaches count 2 before Sad does.
        assert_eq!(majority_vote(&[Happy, Sad, Happy, Sad]), Happy);
        // Sad reaches count 1 first.
        assert_eq!(majority_vote(&[Sad, Happy]), Sad);
    }

    #[test]
    fn test_window_votes_after_sample_budget() {
        use EmotionLabel::*;
        let frame = Frame::black(FrameShape::new(8, 8));
        let mut caps = caps_with_labels(&[Happy, Happy, Sad]);
        let mut window = EmotionWindow::new(3, 1);
        let mut result = DetectionResult::default();

        for expect_vote in [false, false, true] {
            result.faces = caps.detector.detect_faces(&frame).unwrap();
            let vote = window.advance(&mut caps, &frame, &mut result).unwrap();
            assert_eq!(vote.is_some(), expect_vote);
            if let Some(label) = vote {
                assert_eq!(label, Happy);
            }
        }
        assert!(window.labels.is_empty(), "window resets after voting");
        assert_eq!(window.ticks, 0);
    }

    #[test]
    fn test_window_skips_between_samples() {
        use EmotionLabel::*;
        let frame = Frame::black(FrameShape::new(8, 8));
        let mut caps = caps_with_labels(&[Happy, Happy]);
        let mut window = EmotionWindow::new(2, 3);
        let mut result = DetectionResult::default();
        result.faces = vec![face()];

        // Samples on ticks 0 and 3 only; vote lands on tick 3.
        let mut votes = Vec::new();
        for _ in 0..4 {
            votes.push(window.advance(&mut caps, &frame, &mut result).unwrap());
        }
        assert!(votes[0].is_none() && votes[1].is_none() && votes[2].is_none());
        assert_eq!(votes[3], Some(Happy));
    }

    #[test]
    fn test_window_no_face_does_not_consume_budget() {
        let frame = Frame::black(FrameShape::new(8, 8));
        let mut caps = Capabilities {
            detector: Box::new(ScriptedDetector::always(vec![])),
            classifier: Box::new(ScriptedClassifier::new(vec![])),
        };
        let mut window = EmotionWindow::new(2, 1);
        let mut result = DetectionResult::default();

        for _ in 0..10 {
            result.faces.clear();
            let vote = window.advance(&mut caps, &frame, &mut result).unwrap();
            assert!(vote.is_none());
        }
        assert!(window.labels.is_empty());
    }
}
