//! botender-core — the kiosk's perception pipeline.
//!
//! A dedicated detection worker runs face detection and on-demand emotion
//! classification, decoupled from the caller's fixed-rate tick loop through
//! a latest-wins frame slot and a FIFO result channel. The
//! [`PerceptionManager`] is the only surface the rest of the kiosk talks to.

pub mod capabilities;
pub mod channel;
pub mod fakes;
pub mod manager;
pub mod signals;
pub mod types;
pub mod worker;

pub use capabilities::{CapabilityError, EmotionClassifier, FaceDetector};
pub use channel::FrameSlot;
pub use manager::{PerceptionManager, ShutdownOutcome};
pub use signals::ControlSignals;
pub use types::{BoundingBox, DetectionResult, EmotionLabel, FaceFeatures, Frame, FrameShape};
pub use worker::{WorkerConfig, WorkerHandle, WorkerMessage};
