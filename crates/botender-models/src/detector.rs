//! UltraFace face detector via ONNX Runtime.
//!
//! Uses the version-RFB-320 UltraFace model: a single forward pass
//! producing per-anchor confidence scores and normalized corner-point
//! boxes, post-processed with confidence thresholding and NMS.

use botender_core::capabilities::{CapabilityError, FaceDetector};
use botender_core::types::{BoundingBox, Frame};
use image::imageops::FilterType;
use image::RgbImage;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

// --- Named constants ---
const ULTRAFACE_INPUT_WIDTH: u32 = 320;
const ULTRAFACE_INPUT_HEIGHT: u32 = 240;
const ULTRAFACE_MEAN: f32 = 127.0;
const ULTRAFACE_STD: f32 = 128.0;
const ULTRAFACE_CONFIDENCE_THRESHOLD: f32 = 0.7;
const ULTRAFACE_NMS_THRESHOLD: f32 = 0.5;
/// Values per anchor in the score tensor: [background, face].
const ULTRAFACE_SCORE_STRIDE: usize = 2;
/// Values per anchor in the box tensor: [x1, y1, x2, y2], normalized.
const ULTRAFACE_BOX_STRIDE: usize = 4;

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("model file not found: {0} — download version-RFB-320.onnx and place it in the model directory")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

/// UltraFace-based face detector.
pub struct OnnxFaceDetector {
    session: Session,
    /// (scores, boxes) output tensor indices, discovered by name at load
    /// time with a positional fallback.
    output_indices: (usize, usize),
}

impl OnnxFaceDetector {
    /// Load the UltraFace ONNX model from the given path.
    pub fn load(model_path: &str) -> Result<Self, DetectorError> {
        if !Path::new(model_path).exists() {
            return Err(DetectorError::ModelNotFound(model_path.to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        let output_names: Vec<String> =
            session.outputs().iter().map(|o| o.name().to_string()).collect();
        tracing::info!(
            path = model_path,
            outputs = ?output_names,
            "loaded UltraFace model"
        );

        let scores_idx = output_names.iter().position(|n| n == "scores").unwrap_or(0);
        let boxes_idx = output_names.iter().position(|n| n == "boxes").unwrap_or(1);

        Ok(Self {
            session,
            output_indices: (scores_idx, boxes_idx),
        })
    }

    fn detect(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, DetectorError> {
        let input = preprocess(frame);

        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (scores_idx, boxes_idx) = self.output_indices;
        let (_, scores) = outputs[scores_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("scores: {e}")))?;
        let (_, boxes) = outputs[boxes_idx]
            .try_extract_tensor::<f32>()
            .map_err(|e| DetectorError::InferenceFailed(format!("boxes: {e}")))?;

        Ok(decode(
            scores,
            boxes,
            frame.width(),
            frame.height(),
            ULTRAFACE_CONFIDENCE_THRESHOLD,
        ))
    }
}

impl FaceDetector for OnnxFaceDetector {
    fn detect_faces(&mut self, frame: &Frame) -> Result<Vec<BoundingBox>, CapabilityError> {
        self.detect(frame)
            .map_err(|e| CapabilityError::Inference(e.to_string()))
    }
}

/// Resize a packed RGB frame to the UltraFace input and normalize it into
/// a NCHW float tensor.
fn preprocess(frame: &Frame) -> Array4<f32> {
    let rgb = RgbImage::from_raw(frame.width(), frame.height(), frame.data.clone())
        .unwrap_or_else(|| RgbImage::new(frame.width(), frame.height()));
    let resized = image::imageops::resize(
        &rgb,
        ULTRAFACE_INPUT_WIDTH,
        ULTRAFACE_INPUT_HEIGHT,
        FilterType::Triangle,
    );

    let (w, h) = (ULTRAFACE_INPUT_WIDTH as usize, ULTRAFACE_INPUT_HEIGHT as usize);
    let mut tensor = Array4::<f32>::zeros((1, 3, h, w));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] =
                (pixel.0[c] as f32 - ULTRAFACE_MEAN) / ULTRAFACE_STD;
        }
    }
    tensor
}

/// Decode per-anchor scores and normalized boxes into pixel-space
/// detections, NMS-filtered and sorted by confidence.
fn decode(
    scores: &[f32],
    boxes: &[f32],
    frame_width: u32,
    frame_height: u32,
    threshold: f32,
) -> Vec<BoundingBox> {
    let num_anchors = scores.len() / ULTRAFACE_SCORE_STRIDE;
    let (fw, fh) = (frame_width as f32, frame_height as f32);

    let mut detections = Vec::new();
    for idx in 0..num_anchors {
        let confidence = scores[idx * ULTRAFACE_SCORE_STRIDE + 1];
        if confidence <= threshold {
            continue;
        }
        let b = idx * ULTRAFACE_BOX_STRIDE;
        if b + 3 >= boxes.len() {
            break;
        }
        detections.push(BoundingBox {
            x_min: (boxes[b] * fw).clamp(0.0, fw),
            y_min: (boxes[b + 1] * fh).clamp(0.0, fh),
            x_max: (boxes[b + 2] * fw).clamp(0.0, fw),
            y_max: (boxes[b + 3] * fh).clamp(0.0, fh),
            confidence,
        });
    }

    let mut result = nms(detections, ULTRAFACE_NMS_THRESHOLD);
    result.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    result
}

/// Intersection-over-union of two boxes.
fn iou(a: &BoundingBox, b: &BoundingBox) -> f32 {
    let ix = (a.x_max.min(b.x_max) - a.x_min.max(b.x_min)).max(0.0);
    let iy = (a.y_max.min(b.y_max) - a.y_min.max(b.y_min)).max(0.0);
    let intersection = ix * iy;
    let union = a.area() + b.area() - intersection;
    if union > 0.0 {
        intersection / union
    } else {
        0.0
    }
}

/// Greedy non-maximum suppression, keeping the highest-confidence box of
/// each overlapping cluster.
fn nms(mut detections: Vec<BoundingBox>, threshold: f32) -> Vec<BoundingBox> {
    detections.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut kept: Vec<BoundingBox> = Vec::new();
    for det in detections {
        if kept.iter().all(|k| iou(k, &det) < threshold) {
            kept.push(det);
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use botender_core::types::FrameShape;

    fn bbox(x_min: f32, y_min: f32, x_max: f32, y_max: f32, confidence: f32) -> BoundingBox {
        BoundingBox {
            x_min,
            y_min,
            x_max,
            y_max,
            confidence,
        }
    }

    #[test]
    fn test_preprocess_shape_and_normalization() {
        let frame = Frame::black(FrameShape::new(640, 480));
        let tensor = preprocess(&frame);
        assert_eq!(
            tensor.shape(),
            &[
                1,
                3,
                ULTRAFACE_INPUT_HEIGHT as usize,
                ULTRAFACE_INPUT_WIDTH as usize
            ]
        );
        // Black pixels normalize to (0 - 127) / 128.
        let expected = (0.0 - ULTRAFACE_MEAN) / ULTRAFACE_STD;
        assert!((tensor[[0, 0, 0, 0]] - expected).abs() < 1e-6);
    }

    #[test]
    fn test_iou_disjoint_and_identical() {
        let a = bbox(0.0, 0.0, 10.0, 10.0, 1.0);
        let b = bbox(20.0, 20.0, 30.0, 30.0, 1.0);
        assert_eq!(iou(&a, &b), 0.0);
        assert!((iou(&a, &a) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nms_suppresses_overlaps() {
        let detections = vec![
            bbox(0.0, 0.0, 10.0, 10.0, 0.9),
            bbox(1.0, 1.0, 11.0, 11.0, 0.8), // heavy overlap with the first
            bbox(50.0, 50.0, 60.0, 60.0, 0.7),
        ];
        let kept = nms(detections, 0.5);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].confidence, 0.9);
        assert_eq!(kept[1].confidence, 0.7);
    }

    #[test]
    fn test_decode_thresholds_and_scales() {
        // Two anchors: one below threshold, one above with a normalized
        // box covering the center quarter of the frame.
        let scores = [0.9, 0.1, 0.1, 0.9];
        let boxes = [0.0, 0.0, 0.1, 0.1, 0.25, 0.25, 0.75, 0.75];
        let result = decode(&scores, &boxes, 640, 480, ULTRAFACE_CONFIDENCE_THRESHOLD);

        assert_eq!(result.len(), 1);
        let face = &result[0];
        assert!((face.x_min - 160.0).abs() < 1e-3);
        assert!((face.y_min - 120.0).abs() < 1e-3);
        assert!((face.x_max - 480.0).abs() < 1e-3);
        assert!((face.y_max - 360.0).abs() < 1e-3);
    }

    #[test]
    fn test_decode_empty_scores() {
        let result = decode(&[], &[], 640, 480, ULTRAFACE_CONFIDENCE_THRESHOLD);
        assert!(result.is_empty());
    }
}
