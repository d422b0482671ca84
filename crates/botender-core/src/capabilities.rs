//! Capability boundaries for the opaque ML models.
//!
//! The pipeline consumes face detection and emotion classification as
//! polymorphic capabilities: `botender-models` provides ONNX-backed
//! implementations, [`crate::fakes`] provides deterministic scripted ones.

use crate::types::{BoundingBox, EmotionLabel, FaceFeatures, Frame};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("capability load failed: {0}")]
    LoadFailed(String),
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Face detection over one frame.
pub trait FaceDetector: Send {
    /// Detect faces, returning bounding boxes ordered by confidence;
    /// empty if none were found.
    fn detect_faces(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, CapabilityError>;
}

/// Feature extraction and emotion classification for detected faces.
pub trait EmotionClassifier: Send {
    /// Extract classifier-ready features, one vector per face.
    fn extract_features(
        &mut self,
        frame: &Frame,
        faces: &[BoundingBox],
    ) -> Result<Vec<FaceFeatures>, CapabilityError>;

    /// Classify the user's emotion from the primary face.
    fn classify(
        &mut self,
        frame: &Frame,
        faces: &[BoundingBox],
        features: &[FaceFeatures],
    ) -> Result<EmotionLabel, CapabilityError>;
}

/// Both capabilities the worker owns, constructed inside the worker thread
/// because model loading can take seconds.
pub struct Capabilities {
    pub detector: Box<dyn FaceDetector>,
    pub classifier: Box<dyn EmotionClassifier>,
}

/// Factory run on the worker thread before the readiness signal is sent.
pub type CapabilityFactory =
    Box<dyn FnOnce() -> Result<Capabilities, CapabilityError> + Send + 'static>;
