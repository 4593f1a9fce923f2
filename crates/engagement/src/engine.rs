//! Engagement engine: one frame in, one snapshot out

use std::sync::Arc;

use camera_capture::VideoFrame;
use face_detect::{BackendKind, BackendSelector, FaceDetect, PlatformFaceDetector};
use ring_buffer::RingBuffer;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::confidence;
use crate::extractor::FeatureExtractor;
use crate::gesture::{Gesture, GestureClassifier};
use crate::observation::RawObservation;
use crate::posture::{PositionSample, Posture, PostureClassifier};
use crate::scorer::EngagementScorer;
use crate::snapshot::EngagementSnapshot;
use crate::stabilizer::Stabilizer;
use crate::ConfigError;

/// Per-session inference state. Everything here is owned by one engine, so
/// concurrent sessions never interfere.
pub struct EngagementEngine {
    config: EngineConfig,
    extractor: FeatureExtractor,
    observations: RingBuffer<RawObservation>,
    positions: RingBuffer<PositionSample>,
    stabilizer: Stabilizer,
    posture: PostureClassifier,
    gestures: GestureClassifier,
    scorer: EngagementScorer,
    frames_in_position: u32,
}

impl EngagementEngine {
    /// Validate the configuration and select a backend
    pub fn new(
        config: EngineConfig,
        platform: Option<Arc<dyn PlatformFaceDetector>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let backend = BackendSelector::select(&config.detection, platform);
        Ok(Self::assemble(config, backend))
    }

    /// Use a specific backend, bypassing selection
    pub fn with_backend(
        config: EngineConfig,
        backend: Box<dyn FaceDetect>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::assemble(config, backend))
    }

    fn assemble(config: EngineConfig, backend: Box<dyn FaceDetect>) -> Self {
        info!(
            backend = %backend.kind(),
            window_ms = config.stabilizer.window_ms,
            detection_threshold = config.stabilizer.detection_threshold,
            non_detection_threshold = config.stabilizer.non_detection_threshold,
            "Engagement engine ready"
        );

        Self {
            extractor: FeatureExtractor::new(backend, config.grid, config.detection_timeout()),
            observations: RingBuffer::new(config.stabilizer.observation_capacity),
            positions: RingBuffer::new(config.posture.history_capacity),
            stabilizer: Stabilizer::new(config.stabilizer.clone()),
            posture: PostureClassifier::new(config.posture.clone()),
            gestures: GestureClassifier::new(config.gesture.clone()),
            scorer: EngagementScorer::new(config.scoring.clone()),
            frames_in_position: 0,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.extractor.backend_kind()
    }

    pub fn detection_failures(&self) -> u64 {
        self.extractor.failures()
    }

    pub fn fps(&self) -> f64 {
        self.extractor.fps()
    }

    /// Observation recorded on the most recent tick
    pub fn last_observation(&self) -> Option<&RawObservation> {
        self.observations.latest()
    }

    /// Run one tick over `frame`
    pub async fn process_frame(&mut self, frame: &VideoFrame) -> EngagementSnapshot {
        let raw = self.extractor.extract(frame).await;
        let now = raw.captured_at;
        let window_ms = self.config.stabilizer.window_ms;

        let located = raw.bounding_box.filter(|_| raw.detected);
        if let Some(bbox) = &located {
            self.positions.push(PositionSample::from(bbox));
        }

        let observation = match (located, raw.face_ratio()) {
            (Some(_), Some(ratio)) => raw.with_confidence(confidence::adjust(
                raw.confidence,
                &self.positions,
                ratio,
                &self.config.posture,
            )),
            _ => raw,
        };

        self.observations.evict_older_than(now, window_ms);
        self.observations.push(observation);
        let presence = self
            .stabilizer
            .update(self.observations.window(now, window_ms));

        if presence.changed && !presence.state.is_in_frame() {
            self.positions.clear();
            self.frames_in_position = 0;
        }

        let posture = match &located {
            Some(bbox) => self.posture.classify(
                bbox,
                observation.frame_width,
                observation.frame_height,
                &self.positions,
            ),
            None => Posture::Unknown,
        };

        if !observation.detected {
            self.frames_in_position = 0;
        } else if observation
            .face_ratio()
            .is_some_and(|ratio| self.posture.within_distance_bounds(ratio))
        {
            self.frames_in_position = self.frames_in_position.saturating_add(1);
        }

        let (gesture, focus_score, movement_level) = if located.is_some() {
            (
                self.gestures.classify(&self.positions),
                self.scorer
                    .update_focus(&self.positions, posture, self.frames_in_position),
                self.scorer.update_movement(&self.positions),
            )
        } else if !presence.state.is_in_frame() {
            (Gesture::None, self.scorer.decay_focus(), self.scorer.movement_level())
        } else {
            (Gesture::None, self.scorer.focus_score(), self.scorer.movement_level())
        };

        let snapshot = EngagementSnapshot {
            in_frame: presence.state.is_in_frame(),
            confidence: presence.confidence,
            posture,
            gesture,
            focus_score,
            movement_level,
            lighting_ok: observation.frame_brightness_mean >= self.config.lighting_floor,
            frames_in_position: self.frames_in_position,
            focus_ready: self.frames_in_position >= self.config.scoring.focus_ready_ticks,
            backend: self.extractor.backend_kind(),
            timestamp: now,
        };

        debug!(
            sequence = frame.sequence,
            in_frame = snapshot.in_frame,
            confidence = snapshot.confidence,
            posture = ?snapshot.posture,
            focus = snapshot.focus_score,
            "Tick processed"
        );

        snapshot
    }

    /// Drop all accumulated state; the backend stays selected
    pub fn reset(&mut self) {
        self.extractor.reset();
        self.observations.clear();
        self.positions.clear();
        self.stabilizer.reset();
        self.scorer.reset();
        self.frames_in_position = 0;
    }
}
