use serde::{Deserialize, Serialize};

/// Number of interleaved channels in a [`Frame`] (packed RGB24).
pub const FRAME_CHANNELS: usize = 3;

/// Fixed frame geometry agreed between the capture surface and the
/// pipeline at startup. Every frame written into the pipeline must match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
}

impl FrameShape {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Byte length of one packed RGB24 frame of this shape.
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * FRAME_CHANNELS
    }
}

/// One captured image buffer of fixed shape.
///
/// Ownership is transient: the capture surface produces one per tick, the
/// worker consumes a copy out of the frame slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Packed RGB24 pixel data (`width * height * 3` bytes).
    pub data: Vec<u8>,
    pub shape: FrameShape,
}

impl Frame {
    /// All-black frame, the capture surface's value before the first capture.
    pub fn black(shape: FrameShape) -> Self {
        Self {
            data: vec![0u8; shape.byte_len()],
            shape,
        }
    }

    pub fn width(&self) -> u32 {
        self.shape.width
    }

    pub fn height(&self) -> u32 {
        self.shape.height
    }
}

/// Bounding box for a detected face: two corner points in pixel space,
/// plus the detector's confidence.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x_min: f32,
    pub y_min: f32,
    pub x_max: f32,
    pub y_max: f32,
    pub confidence: f32,
}

impl BoundingBox {
    pub fn width(&self) -> f32 {
        (self.x_max - self.x_min).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y_max - self.y_min).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }
}

/// Classifier-ready feature vector for one detected face.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaceFeatures {
    pub values: Vec<f32>,
}

/// The fixed emotion label set the dialogue layer understands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmotionLabel {
    Happy,
    Sad,
    Angry,
    #[default]
    Neutral,
}

impl EmotionLabel {
    pub const ALL: [EmotionLabel; 4] = [
        EmotionLabel::Happy,
        EmotionLabel::Sad,
        EmotionLabel::Angry,
        EmotionLabel::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EmotionLabel::Happy => "happy",
            EmotionLabel::Sad => "sad",
            EmotionLabel::Angry => "angry",
            EmotionLabel::Neutral => "neutral",
        }
    }

    /// Dense index for counting buffers.
    pub(crate) fn index(&self) -> usize {
        match self {
            EmotionLabel::Happy => 0,
            EmotionLabel::Sad => 1,
            EmotionLabel::Angry => 2,
            EmotionLabel::Neutral => 3,
        }
    }
}

impl std::fmt::Display for EmotionLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The worker's per-tick output.
///
/// Created once by the worker at startup with defaults, mutated in place
/// every loop iteration, and sent over the result channel as a snapshot.
/// The manager treats received instances as immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionResult {
    /// Detected faces, ordered by confidence; empty when none were found.
    pub faces: Vec<BoundingBox>,
    /// Per-face feature vectors; empty outside an emotion-detection window.
    pub features: Vec<FaceFeatures>,
    /// Smoothed emotion label; persists until the next completed majority vote.
    pub emotion: EmotionLabel,
}

impl Default for DetectionResult {
    fn default() -> Self {
        Self {
            faces: Vec::new(),
            features: Vec::new(),
            emotion: EmotionLabel::Neutral,
        }
    }
}

impl DetectionResult {
    pub fn face_present(&self) -> bool {
        !self.faces.is_empty()
    }
}
