//! Pixel-statistics presence heuristic
//!
//! Scores a frame on three cues from the sampling grid:
//! - brightness above a floor (enough light to see anyone)
//! - brightness spread above a floor (something textured in view)
//! - motion against the previous frame
//!
//! Motion alone can never reach the presence score. The heuristic does not
//! localize faces, so detections carry no bounding box.

use async_trait::async_trait;
use camera_capture::VideoFrame;
use feature_engine::{FrameFeatures, MotionStats};
use tracing::trace;

use crate::config::HeuristicConfig;
use crate::{BackendKind, DetectError, Detection, FaceDetect};

/// Brightness-spread detector; always available
#[derive(Debug, Clone, Default)]
pub struct HeuristicBackend {
    config: HeuristicConfig,
}

impl HeuristicBackend {
    pub fn new(config: HeuristicConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    fn has_motion(&self, motion: Option<&MotionStats>) -> bool {
        motion.is_some_and(|m| {
            m.changed_ratio > self.config.changed_ratio_floor
                || m.significant_ratio > self.config.significant_ratio_floor
        })
    }

    /// Evaluate precomputed features
    pub fn evaluate(&self, features: &FrameFeatures) -> Detection {
        let cfg = &self.config;
        let stats = &features.stats;

        let bright = stats.brightness_mean > cfg.brightness_floor;
        let varied = stats.brightness_std_dev > cfg.std_dev_floor;
        let moving = self.has_motion(features.motion.as_ref());

        let mut score = 0.0;
        if bright {
            score += cfg.brightness_weight;
        }
        if varied {
            score += cfg.variation_weight;
        }
        if moving {
            score += cfg.motion_weight;
        }

        trace!(bright, varied, moving, score, "Heuristic score");

        if score < cfg.presence_score {
            return Detection::none();
        }

        let bonus = if moving { cfg.motion_bonus } else { 0.0 };
        let confidence = (stats.brightness_std_dev / 1.5 + bonus).min(cfg.max_confidence);
        Detection::found(confidence, None)
    }
}

#[async_trait]
impl FaceDetect for HeuristicBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Heuristic
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn detect(
        &mut self,
        frame: &VideoFrame,
        features: &FrameFeatures,
    ) -> Result<Detection, DetectError> {
        if features.stats.sample_count == 0 {
            return Err(DetectError::InvalidFrame(format!(
                "no samples from {}x{} frame",
                frame.width, frame.height
            )));
        }
        Ok(self.evaluate(features))
    }
}
