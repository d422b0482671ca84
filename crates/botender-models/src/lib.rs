//! botender-models — ONNX-backed perception capabilities.
//!
//! Implements the core capability traits with an UltraFace face detector
//! and a FER+ emotion classifier, both running via ONNX Runtime for CPU
//! inference.

pub mod classifier;
pub mod detector;

pub use classifier::OnnxEmotionClassifier;
pub use detector::OnnxFaceDetector;

use botender_core::capabilities::{Capabilities, CapabilityError};

/// Load both capabilities from their model files.
///
/// Intended to run on the detection worker thread: loading can take
/// seconds and must not block the tick loop.
pub fn load(detector_path: &str, classifier_path: &str) -> Result<Capabilities, CapabilityError> {
    let detector = OnnxFaceDetector::load(detector_path)
        .map_err(|e| CapabilityError::LoadFailed(e.to_string()))?;
    let classifier = OnnxEmotionClassifier::load(classifier_path)
        .map_err(|e| CapabilityError::LoadFailed(e.to_string()))?;
    Ok(Capabilities {
        detector: Box::new(detector),
        classifier: Box::new(classifier),
    })
}
