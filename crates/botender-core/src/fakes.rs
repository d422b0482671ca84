//! Deterministic scripted capabilities.
//!
//! Used by the test suite and by the daemon's synthetic mode, where the
//! pipeline runs without model files or a camera.

use crate::capabilities::{CapabilityError, EmotionClassifier, FaceDetector};
use crate::types::{BoundingBox, EmotionLabel, FaceFeatures, Frame};
use std::collections::VecDeque;

/// Detector that replays a script of detections, then repeats the last entry.
pub struct ScriptedDetector {
    script: VecDeque<Vec<BoundingBox>>,
    last: Vec<BoundingBox>,
}

impl ScriptedDetector {
    /// Replay `script` one entry per call; after exhaustion, keep
    /// returning the final entry.
    pub fn new(script: Vec<Vec<BoundingBox>>) -> Self {
        Self {
            script: script.into(),
            last: Vec::new(),
        }
    }

    /// Return the same detections on every call.
    pub fn always(faces: Vec<BoundingBox>) -> Self {
        Self {
            script: VecDeque::new(),
            last: faces,
        }
    }
}

impl FaceDetector for ScriptedDetector {
    fn detect_faces(&mut self, _frame: &Frame) -> Result<Vec<BoundingBox>, CapabilityError> {
        if let Some(faces) = self.script.pop_front() {
            self.last = faces;
        }
        Ok(self.last.clone())
    }
}

/// Classifier that replays a script of labels, then repeats the last one.
pub struct ScriptedClassifier {
    script: VecDeque<EmotionLabel>,
    last: EmotionLabel,
}

impl ScriptedClassifier {
    pub fn new(script: Vec<EmotionLabel>) -> Self {
        Self {
            script: script.into(),
            last: EmotionLabel::Neutral,
        }
    }
}

impl EmotionClassifier for ScriptedClassifier {
    fn extract_features(
        &mut self,
        _frame: &Frame,
        faces: &[BoundingBox],
    ) -> Result<Vec<FaceFeatures>, CapabilityError> {
        Ok(faces
            .iter()
            .map(|b| FaceFeatures {
                values: vec![b.x_min, b.y_min, b.x_max, b.y_max],
            })
            .collect())
    }

    fn classify(
        &mut self,
        _frame: &Frame,
        _faces: &[BoundingBox],
        _features: &[FaceFeatures],
    ) -> Result<EmotionLabel, CapabilityError> {
        if let Some(label) = self.script.pop_front() {
            self.last = label;
        }
        Ok(self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FrameShape;

    #[test]
    fn test_scripted_detector_replays_then_repeats() {
        let frame = Frame::black(FrameShape::new(4, 4));
        let face = BoundingBox {
            x_min: 1.0,
            y_min: 1.0,
            x_max: 2.0,
            y_max: 2.0,
            confidence: 1.0,
        };
        let mut det = ScriptedDetector::new(vec![vec![], vec![face]]);
        assert!(det.detect_faces(&frame).unwrap().is_empty());
        assert_eq!(det.detect_faces(&frame).unwrap().len(), 1);
        assert_eq!(det.detect_faces(&frame).unwrap().len(), 1);
    }

    #[test]
    fn test_scripted_classifier_replays_then_repeats() {
        let frame = Frame::black(FrameShape::new(4, 4));
        let mut cls = ScriptedClassifier::new(vec![EmotionLabel::Sad]);
        assert_eq!(
            cls.classify(&frame, &[], &[]).unwrap(),
            EmotionLabel::Sad
        );
        assert_eq!(
            cls.classify(&frame, &[], &[]).unwrap(),
            EmotionLabel::Sad
        );
    }
}
