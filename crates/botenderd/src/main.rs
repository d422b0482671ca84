use anyhow::Result;
use botender_core::capabilities::{Capabilities, CapabilityFactory};
use botender_core::fakes::{ScriptedClassifier, ScriptedDetector};
use botender_core::{
    BoundingBox, EmotionLabel, FrameShape, PerceptionManager, ShutdownOutcome, WorkerConfig,
};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod config;
mod source;

use config::Config;
use source::SyntheticFrameSource;

#[derive(Parser)]
#[command(name = "botenderd", about = "Botender kiosk perception daemon")]
struct Cli {
    /// Enable debug logging
    #[arg(long)]
    debug: bool,
    /// Run on scripted capabilities instead of ONNX models
    #[arg(long)]
    synthetic: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter)),
        )
        .init();

    tracing::info!("botenderd starting");

    let config = Config::from_env();
    let shape = FrameShape::new(config.frame_width, config.frame_height);
    let worker_config = WorkerConfig {
        sample_count: config.emotion_samples,
        frame_skip: config.emotion_frame_skip,
        idle_backoff: config.worker_idle_backoff,
    };

    let factory = build_factory(&config, cli.synthetic);
    let mut manager =
        PerceptionManager::spawn(shape, factory, worker_config, config.shutdown_grace)?;

    let mut source = SyntheticFrameSource::new(shape);
    let mut driver = PresenceDriver::new(config.presence_stable_ticks);
    let mut ticker = tokio::time::interval(config.tick_interval);

    tracing::info!(
        width = shape.width,
        height = shape.height,
        tick_ms = config.tick_interval.as_millis() as u64,
        "entering tick loop"
    );

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let frame = source.capture();
                manager.run(frame)?;
                driver.tick(&manager);
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupt received");
                break;
            }
        }
    }

    match manager.shutdown() {
        ShutdownOutcome::Graceful => tracing::info!("botenderd stopped"),
        ShutdownOutcome::Forced => tracing::warn!("botenderd stopped; worker was abandoned"),
    }
    Ok(())
}

fn build_factory(config: &Config, synthetic: bool) -> CapabilityFactory {
    if synthetic {
        tracing::info!("running with scripted capabilities (--synthetic)");
        let face = BoundingBox {
            x_min: 200.0,
            y_min: 120.0,
            x_max: 440.0,
            y_max: 360.0,
            confidence: 0.9,
        };
        return Box::new(move || {
            Ok(Capabilities {
                detector: Box::new(ScriptedDetector::always(vec![face])),
                classifier: Box::new(ScriptedClassifier::new(vec![EmotionLabel::Happy])),
            })
        });
    }

    let detector_path = config.detector_model_path();
    let emotion_path = config.emotion_model_path();
    Box::new(move || botender_models::load(&detector_path, &emotion_path))
}

/// Minimal stand-in for the dialogue layer: watches presence transitions
/// and runs one emotion-detection window per presence episode.
struct PresenceDriver {
    stable_ticks: u32,
    was_present: bool,
    requested: bool,
    awaiting_vote: bool,
}

impl PresenceDriver {
    fn new(stable_ticks: u32) -> Self {
        Self {
            stable_ticks,
            was_present: false,
            requested: false,
            awaiting_vote: false,
        }
    }

    fn tick(&mut self, manager: &PerceptionManager) {
        let present = manager.face_present();
        if present && !self.was_present {
            tracing::info!("face appeared");
        } else if !present && self.was_present {
            tracing::info!("face lost");
            self.requested = false;
            self.awaiting_vote = false;
        }
        self.was_present = present;

        if present
            && !self.requested
            && manager.face_presence_counter() >= self.stable_ticks
        {
            tracing::info!(
                streak = manager.face_presence_counter(),
                "presence stable; starting emotion window"
            );
            manager.detect_emotion();
            self.requested = true;
            self.awaiting_vote = true;
        }

        if self.awaiting_vote && !manager.detects_emotion() {
            if let Some(result) = manager.current_result() {
                tracing::info!(emotion = %result.emotion, "emotion window voted");
            }
            self.awaiting_vote = false;
        }
    }
}
