//! Engine configuration

use std::path::Path;

use face_detect::DetectionConfig;
use feature_engine::SamplingGrid;
use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// Engine configuration; fixed once an engine is constructed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Hysteresis over the observation window
    pub stabilizer: StabilizerConfig,

    /// Posture bounds and position history
    pub posture: PostureConfig,

    /// Gesture thresholds
    pub gesture: GestureConfig,

    /// Focus score and movement level
    pub scoring: ScoringConfig,

    /// Brightness mean below which lighting is reported poor (0-255)
    pub lighting_floor: f64,

    /// Tick loop period (milliseconds)
    pub tick_interval_ms: u64,

    /// Per-tick detection budget (milliseconds)
    pub detection_timeout_ms: u64,

    /// Frame sampling grid for brightness and motion
    pub grid: SamplingGrid,

    /// Backend selection
    pub detection: DetectionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            stabilizer: StabilizerConfig::default(),
            posture: PostureConfig::default(),
            gesture: GestureConfig::default(),
            scoring: ScoringConfig::default(),
            lighting_floor: 40.0,
            tick_interval_ms: 100,
            detection_timeout_ms: 500,
            grid: SamplingGrid::default(),
            detection: DetectionConfig::default(),
        }
    }
}

/// Presence hysteresis settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizerConfig {
    /// Positives in the window needed to enter the frame
    pub detection_threshold: u32,

    /// Misses in the window needed to leave the frame
    pub non_detection_threshold: u32,

    /// Re-enter on any positive in the window while out of frame
    pub lenient_reentry: bool,

    /// Observation window (milliseconds)
    pub window_ms: u64,

    /// Hard bound on retained observations
    pub observation_capacity: usize,
}

impl Default for StabilizerConfig {
    fn default() -> Self {
        Self {
            detection_threshold: 2,
            non_detection_threshold: 3,
            lenient_reentry: true,
            window_ms: 2000,
            observation_capacity: 64,
        }
    }
}

/// Posture classification bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostureConfig {
    /// Max center distance for good posture, as a share of frame width
    pub centered_ratio: f64,

    /// Average center y above `frame center * factor` suggests slouching
    pub slouch_y_factor: f64,

    /// Slouching also needs distance above `max distance * factor`
    pub slouch_distance_factor: f64,

    /// Face area over frame area above which the face is too close
    pub too_close_ratio: f64,

    /// Face area over frame area below which the face is too far
    pub too_far_ratio: f64,

    /// Position samples retained
    pub history_capacity: usize,
}

impl Default for PostureConfig {
    fn default() -> Self {
        Self {
            centered_ratio: 0.3,
            slouch_y_factor: 1.2,
            slouch_distance_factor: 0.7,
            too_close_ratio: 0.22,
            too_far_ratio: 0.008,
            history_capacity: 30,
        }
    }
}

/// Gesture thresholds (pixels per tick)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Samples examined per classification
    pub window: usize,

    /// Minimum absolute mean step along the gesture axis
    pub min_mean_step: f64,

    /// Minimum step variance along the gesture axis
    pub min_axis_variance: f64,

    /// Maximum step variance along the other axis
    pub max_cross_variance: f64,

    /// Upward travel (first y - last y) for a hand raise
    pub hand_raise_rise: f64,

    /// Maximum y step variance for a hand raise
    pub hand_raise_max_variance: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            window: 10,
            min_mean_step: 2.0,
            min_axis_variance: 10.0,
            max_cross_variance: 5.0,
            hand_raise_rise: 30.0,
            hand_raise_max_variance: 10.0,
        }
    }
}

/// Focus score and movement level settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Weight on the previous focus score
    pub smoothing: f64,

    /// Samples used for the stability component
    pub stability_window: usize,

    /// Samples used for the movement level
    pub movement_window: usize,

    /// Average step below which movement is low
    pub low_movement_avg: f64,
    /// Step variance below which movement is low
    pub low_movement_variance: f64,
    /// Average step below which movement is medium
    pub medium_movement_avg: f64,
    /// Step variance below which movement is medium
    pub medium_movement_variance: f64,

    /// Force `high` movement when any single step exceeds `burst_threshold`
    pub burst_override: bool,

    /// Single-step displacement that counts as a burst (pixels)
    pub burst_threshold: f64,

    /// In-position ticks before hosts show the focus score
    pub focus_ready_ticks: u32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            smoothing: 0.7,
            stability_window: 5,
            movement_window: 10,
            low_movement_avg: 3.0,
            low_movement_variance: 10.0,
            medium_movement_avg: 10.0,
            medium_movement_variance: 30.0,
            burst_override: true,
            burst_threshold: 30.0,
            focus_ready_ticks: 30,
        }
    }
}

impl EngineConfig {
    /// Quicker to report presence changes, more prone to flicker
    pub fn responsive() -> Self {
        Self {
            stabilizer: StabilizerConfig {
                detection_threshold: 1,
                non_detection_threshold: 2,
                window_ms: 1500,
                ..Default::default()
            },
            tick_interval_ms: 66,
            ..Default::default()
        }
    }

    /// Slower to change state; for noisy cameras and backends
    pub fn steady() -> Self {
        Self {
            stabilizer: StabilizerConfig {
                detection_threshold: 3,
                non_detection_threshold: 5,
                lenient_reentry: false,
                window_ms: 3000,
                ..Default::default()
            },
            scoring: ScoringConfig {
                smoothing: 0.8,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// Load from a TOML/YAML/JSON file layered with `PRESENCE__*` environment
    /// overrides, then validate
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(
                config::Environment::with_prefix("PRESENCE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: EngineConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.stabilizer;
        ensure(s.detection_threshold > 0, "stabilizer.detection_threshold", "must be at least 1")?;
        ensure(
            s.non_detection_threshold > 0,
            "stabilizer.non_detection_threshold",
            "must be at least 1",
        )?;
        ensure(s.window_ms > 0, "stabilizer.window_ms", "must be positive")?;
        ensure(
            s.observation_capacity > 0,
            "stabilizer.observation_capacity",
            "must be positive",
        )?;

        ensure(self.tick_interval_ms > 0, "tick_interval_ms", "must be positive")?;
        ensure(
            s.observation_capacity >= self.observations_per_window(),
            "stabilizer.observation_capacity",
            "must hold one observation per tick across the window",
        )?;
        ensure(self.detection_timeout_ms > 0, "detection_timeout_ms", "must be positive")?;
        ensure(
            (0.0..=255.0).contains(&self.lighting_floor),
            "lighting_floor",
            "must be within [0, 255]",
        )?;
        ensure(
            self.grid.columns > 0 && self.grid.rows > 0,
            "grid",
            "needs at least one row and column",
        )?;

        let p = &self.posture;
        ensure(
            p.too_far_ratio > 0.0 && p.too_far_ratio < p.too_close_ratio && p.too_close_ratio < 1.0,
            "posture",
            "face ratios must satisfy 0 < too_far_ratio < too_close_ratio < 1",
        )?;
        ensure(p.centered_ratio > 0.0, "posture.centered_ratio", "must be positive")?;
        ensure(p.history_capacity > 0, "posture.history_capacity", "must be positive")?;

        let g = &self.gesture;
        ensure(g.window >= 2, "gesture.window", "needs at least 2 samples")?;
        ensure(
            g.window <= p.history_capacity,
            "gesture.window",
            "cannot exceed posture.history_capacity",
        )?;

        let sc = &self.scoring;
        ensure(
            (0.0..=1.0).contains(&sc.smoothing),
            "scoring.smoothing",
            "must be within [0, 1]",
        )?;
        ensure(sc.stability_window >= 2, "scoring.stability_window", "needs at least 2 samples")?;
        ensure(sc.movement_window >= 2, "scoring.movement_window", "needs at least 2 samples")?;
        ensure(
            sc.stability_window.max(sc.movement_window) <= p.history_capacity,
            "scoring",
            "windows cannot exceed posture.history_capacity",
        )?;

        let h = &self.detection.heuristic;
        ensure(
            (0.0..=255.0).contains(&h.brightness_floor),
            "detection.heuristic.brightness_floor",
            "must be within [0, 255]",
        )?;
        ensure(
            (0.0..=255.0).contains(&h.std_dev_floor),
            "detection.heuristic.std_dev_floor",
            "must be within [0, 255]",
        )?;
        ensure(
            h.brightness_weight + h.variation_weight >= h.presence_score,
            "detection.heuristic",
            "brightness and variation weights must reach the presence score",
        )?;
        ensure(
            (0.0..=0.1).contains(&h.motion_weight)
                && h.brightness_weight + h.motion_weight < h.presence_score
                && h.variation_weight + h.motion_weight < h.presence_score,
            "detection.heuristic.motion_weight",
            "must be at most 0.1 and never sufficient for presence",
        )?;

        Ok(())
    }

    /// Ticks that fit in the observation window
    pub fn observations_per_window(&self) -> usize {
        let ticks = self.stabilizer.window_ms.div_ceil(self.tick_interval_ms.max(1));
        usize::try_from(ticks).unwrap_or(usize::MAX)
    }

    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }

    pub fn detection_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.detection_timeout_ms)
    }
}

fn ensure(condition: bool, field: &'static str, reason: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::Invalid {
            field,
            reason: reason.to_string(),
        })
    }
}
