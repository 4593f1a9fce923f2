//! Focus score and movement level

use feature_engine::StatisticalFeatures;
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ScoringConfig;
use crate::posture::{step_lengths, PositionSample, Posture};

const BASELINE: f64 = 50.0;
const MAX_STABILITY_POINTS: f64 = 30.0;
const MAX_PRESENCE_POINTS: f64 = 10.0;

/// Coarse head movement level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MovementLevel {
    #[default]
    Low,
    Medium,
    High,
}

/// Smoothed focus score and movement level; values are retained between
/// updates
#[derive(Debug, Clone)]
pub struct EngagementScorer {
    config: ScoringConfig,
    focus: f64,
    movement: MovementLevel,
}

impl EngagementScorer {
    pub fn new(config: ScoringConfig) -> Self {
        Self {
            config,
            focus: 0.0,
            movement: MovementLevel::Low,
        }
    }

    /// Current focus score (0-100)
    pub fn focus_score(&self) -> f64 {
        self.focus
    }

    pub fn movement_level(&self) -> MovementLevel {
        self.movement
    }

    fn posture_points(posture: Posture) -> f64 {
        match posture {
            Posture::Good => 20.0,
            Posture::Unknown => 10.0,
            Posture::Slouching => -10.0,
            Posture::TooClose | Posture::TooFar => 0.0,
        }
    }

    /// Instantaneous score before smoothing; `None` until the stability
    /// window is filled
    pub fn instantaneous(
        &self,
        history: &RingBuffer<PositionSample>,
        posture: Posture,
        frames_in_position: u32,
    ) -> Option<f64> {
        if history.len() < self.config.stability_window {
            return None;
        }

        let steps = step_lengths(history, self.config.stability_window);
        let avg_movement = StatisticalFeatures::compute(&steps).mean;
        let stability = (MAX_STABILITY_POINTS - avg_movement * 2.0).max(0.0);
        let presence = (f64::from(frames_in_position) / 10.0).min(MAX_PRESENCE_POINTS);

        let score = BASELINE + stability + Self::posture_points(posture) + presence;
        Some(score.clamp(0.0, 100.0))
    }

    /// Blend a new instantaneous score in; keeps the previous value when the
    /// history is too short
    pub fn update_focus(
        &mut self,
        history: &RingBuffer<PositionSample>,
        posture: Posture,
        frames_in_position: u32,
    ) -> f64 {
        if let Some(instant) = self.instantaneous(history, posture, frames_in_position) {
            self.blend(instant);
        }
        self.focus
    }

    /// Decay toward zero while nobody is in frame
    pub fn decay_focus(&mut self) -> f64 {
        self.blend(0.0);
        self.focus
    }

    fn blend(&mut self, instant: f64) {
        let s = self.config.smoothing;
        let blended = s * self.focus + (1.0 - s) * instant;
        self.focus = if blended.is_finite() {
            blended.clamp(0.0, 100.0)
        } else {
            0.0
        };
    }

    /// Reclassify movement from the last `movement_window` samples; keeps
    /// the previous level when the history is too short
    pub fn update_movement(&mut self, history: &RingBuffer<PositionSample>) -> MovementLevel {
        let cfg = &self.config;
        if history.len() < cfg.movement_window {
            return self.movement;
        }

        let steps = step_lengths(history, cfg.movement_window);
        let stats = StatisticalFeatures::compute(&steps);

        let mut level = if stats.mean < cfg.low_movement_avg && stats.variance < cfg.low_movement_variance {
            MovementLevel::Low
        } else if stats.mean < cfg.medium_movement_avg
            && stats.variance < cfg.medium_movement_variance
        {
            MovementLevel::Medium
        } else {
            MovementLevel::High
        };

        if cfg.burst_override && stats.max > cfg.burst_threshold {
            level = MovementLevel::High;
        }

        if level != self.movement {
            debug!(from = ?self.movement, to = ?level, avg = stats.mean, "Movement level changed");
        }
        self.movement = level;
        level
    }

    pub fn reset(&mut self) {
        self.focus = 0.0;
        self.movement = MovementLevel::Low;
    }
}

impl Default for EngagementScorer {
    fn default() -> Self {
        Self::new(ScoringConfig::default())
    }
}
