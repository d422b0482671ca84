//! FER+ emotion classifier via ONNX Runtime.
//!
//! Feature extraction crops the detected face, converts it to grayscale,
//! and resizes it to the FER+ input geometry; classification runs the
//! network on the primary face and folds the eight FER+ classes down to
//! the kiosk's four-label set.

use botender_core::capabilities::{CapabilityError, EmotionClassifier};
use botender_core::types::{BoundingBox, EmotionLabel, FaceFeatures, Frame};
use image::imageops::FilterType;
use image::GrayImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const FERPLUS_INPUT_SIZE: u32 = 64;
const FERPLUS_FEATURE_LEN: usize = (FERPLUS_INPUT_SIZE * FERPLUS_INPUT_SIZE) as usize;
const FERPLUS_CLASSES: usize = 8;
/// FER+ output ordering: the kiosk keeps happiness/sadness/anger and maps
/// everything else (surprise, disgust, fear, contempt) to neutral.
const FERPLUS_HAPPINESS: usize = 1;
const FERPLUS_SADNESS: usize = 3;
const FERPLUS_ANGER: usize = 4;

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("model file not found: {0} — download emotion-ferplus-8.onnx and place it in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("no face features to classify")]
    NoFeatures,
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// FER+-based emotion classifier.
pub struct OnnxEmotionClassifier {
    session: Session,
}

impl OnnxEmotionClassifier {
    /// Load the FER+ ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, ClassifierError> {
        if !Path::new(model_path).exists() {
            return Err(ClassifierError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = model_path,
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded FER+ model"
        );

        Ok(Self { session })
    }

    fn classify_features(&mut self, features: &FaceFeatures) -> Result<EmotionLabel, ClassifierError> {
        if features.values.len() != FERPLUS_FEATURE_LEN {
            return Err(ClassifierError::InferenceFailed(format!(
                "expected {FERPLUS_FEATURE_LEN} feature values, got {}",
                features.values.len()
            )));
        }

        let size = FERPLUS_INPUT_SIZE as usize;
        let mut input = Array4::<f32>::zeros((1, 1, size, size));
        for y in 0..size {
            for x in 0..size {
                input[[0, 0, y, x]] = features.values[y * size + x];
            }
        }

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;
        let (_, scores) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceFailed(format!("emotion scores: {e}")))?;

        if scores.len() < FERPLUS_CLASSES {
            return Err(ClassifierError::InferenceFailed(format!(
                "expected {FERPLUS_CLASSES} emotion scores, got {}",
                scores.len()
            )));
        }

        Ok(map_label(argmax(&scores[..FERPLUS_CLASSES])))
    }
}

impl EmotionClassifier for OnnxEmotionClassifier {
    fn extract_features(
        &mut self,
        frame: &Frame,
        faces: &[BoundingBox],
    ) -> Result<Vec<FaceFeatures>, CapabilityError> {
        Ok(faces.iter().map(|face| crop_features(frame, face)).collect())
    }

    fn classify(
        &mut self,
        _frame: &Frame,
        _faces: &[BoundingBox],
        features: &[FaceFeatures],
    ) -> Result<EmotionLabel, CapabilityError> {
        // The primary face is the first one: detections arrive sorted by
        // confidence.
        let primary = features.first().ok_or_else(|| {
            CapabilityError::Inference(ClassifierError::NoFeatures.to_string())
        })?;
        self.classify_features(primary)
            .map_err(|e| CapabilityError::Inference(e.to_string()))
    }
}

/// Crop a face region, convert it to grayscale, and resize it to the FER+
/// input geometry. The values stay in the raw 0–255 range FER+ expects.
fn crop_features(frame: &Frame, face: &BoundingBox) -> FaceFeatures {
    let fw = frame.width();
    let fh = frame.height();

    let x0 = (face.x_min.max(0.0) as u32).min(fw.saturating_sub(1));
    let y0 = (face.y_min.max(0.0) as u32).min(fh.saturating_sub(1));
    let x1 = (face.x_max.max(0.0) as u32).clamp(x0 + 1, fw.max(x0 + 1));
    let y1 = (face.y_max.max(0.0) as u32).clamp(y0 + 1, fh.max(y0 + 1));
    let (cw, ch) = (x1 - x0, y1 - y0);

    let mut gray = GrayImage::new(cw, ch);
    for y in 0..ch {
        for x in 0..cw {
            let offset = (((y0 + y) * fw + (x0 + x)) * 3) as usize;
            let luma = match frame.data.get(offset..offset + 3) {
                Some(p) => {
                    0.299 * p[0] as f32 + 0.587 * p[1] as f32 + 0.114 * p[2] as f32
                }
                None => 0.0,
            };
            gray.put_pixel(x, y, image::Luma([luma.round().clamp(0.0, 255.0) as u8]));
        }
    }

    let resized = image::imageops::resize(
        &gray,
        FERPLUS_INPUT_SIZE,
        FERPLUS_INPUT_SIZE,
        FilterType::Triangle,
    );

    FaceFeatures {
        values: resized.pixels().map(|p| p.0[0] as f32).collect(),
    }
}

fn argmax(scores: &[f32]) -> usize {
    let mut best = 0;
    for (i, &s) in scores.iter().enumerate() {
        if s > scores[best] {
            best = i;
        }
    }
    best
}

/// Fold the FER+ class index down to the kiosk's label set.
fn map_label(class: usize) -> EmotionLabel {
    match class {
        FERPLUS_HAPPINESS => EmotionLabel::Happy,
        FERPLUS_SADNESS => EmotionLabel::Sad,
        FERPLUS_ANGER => EmotionLabel::Angry,
        _ => EmotionLabel::Neutral,
    }
}
