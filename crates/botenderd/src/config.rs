use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration, loaded from environment variables.
pub struct Config {
    /// Fixed frame shape agreed with the capture surface.
    pub frame_width: u32,
    pub frame_height: u32,
    /// Directory containing ONNX model files.
    pub model_dir: PathBuf,
    /// Tick loop period (the capture/render cadence).
    pub tick_interval: Duration,
    /// Labels collected per emotion-detection window.
    pub emotion_samples: usize,
    /// Sample every n-th processed frame while a window is active.
    pub emotion_frame_skip: u32,
    /// Worker idle backoff when no new frame is available.
    pub worker_idle_backoff: Duration,
    /// Grace period before an unresponsive worker is abandoned.
    pub shutdown_grace: Duration,
    /// Consecutive face-present ticks before an emotion window is started.
    pub presence_stable_ticks: u32,
}

impl Config {
    /// Load configuration from `BOTENDER_*` environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            frame_width: env_u32("BOTENDER_FRAME_WIDTH", 640),
            frame_height: env_u32("BOTENDER_FRAME_HEIGHT", 480),
            model_dir: std::env::var("BOTENDER_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("models")),
            tick_interval: Duration::from_millis(env_u64("BOTENDER_TICK_INTERVAL_MS", 10)),
            emotion_samples: env_usize("BOTENDER_EMOTION_SAMPLES", 5),
            emotion_frame_skip: env_u32("BOTENDER_EMOTION_FRAME_SKIP", 3),
            worker_idle_backoff: Duration::from_millis(env_u64("BOTENDER_IDLE_BACKOFF_MS", 10)),
            shutdown_grace: Duration::from_secs(env_u64("BOTENDER_SHUTDOWN_GRACE_SECS", 10)),
            presence_stable_ticks: env_u32("BOTENDER_PRESENCE_STABLE_TICKS", 30),
        }
    }

    /// Path to the UltraFace detection model.
    pub fn detector_model_path(&self) -> String {
        self.model_dir
            .join("version-RFB-320.onnx")
            .to_string_lossy()
            .into_owned()
    }

    /// Path to the FER+ emotion model.
    pub fn emotion_model_path(&self) -> String {
        self.model_dir
            .join("emotion-ferplus-8.onnx")
            .to_string_lossy()
            .into_owned()
    }
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
