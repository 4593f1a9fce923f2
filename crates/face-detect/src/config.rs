//! Detection backend configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Backend selection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Neural-network backend
    pub model: ModelConfig,

    /// Try the host-supplied platform detector before the heuristic
    pub enable_native: bool,

    /// Pixel-statistics fallback
    pub heuristic: HeuristicConfig,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            enable_native: true,
            heuristic: HeuristicConfig::default(),
        }
    }
}

impl DetectionConfig {
    /// Skip model and native backends entirely
    pub fn heuristic_only() -> Self {
        Self {
            model: ModelConfig::default(),
            enable_native: false,
            heuristic: HeuristicConfig::default(),
        }
    }
}

/// ONNX face detector configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model path; no path means no model backend
    pub model_path: Option<PathBuf>,

    /// Network input width
    pub input_width: u32,

    /// Network input height
    pub input_height: u32,

    /// Minimum score (0-1) for a box to count as a face
    pub score_threshold: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            input_width: 128,
            input_height: 128,
            score_threshold: 0.5,
        }
    }
}

/// Pixel heuristic thresholds and weights
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Mean brightness floor (0-255)
    pub brightness_floor: f64,

    /// Brightness standard deviation floor
    pub std_dev_floor: f64,

    pub brightness_weight: f64,
    pub variation_weight: f64,
    pub motion_weight: f64,

    /// Weighted score needed to report presence
    pub presence_score: f64,

    /// Share of changed samples that counts as motion
    pub changed_ratio_floor: f64,

    /// Share of significantly changed samples that counts as motion
    pub significant_ratio_floor: f64,

    /// Confidence ceiling for heuristic detections
    pub max_confidence: f64,

    /// Confidence added when motion is present
    pub motion_bonus: f64,
}

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            brightness_floor: 30.0,
            std_dev_floor: 12.0,
            brightness_weight: 0.5,
            variation_weight: 0.45,
            motion_weight: 0.05,
            presence_score: 0.9,
            changed_ratio_floor: 0.02,
            significant_ratio_floor: 0.008,
            max_confidence: 80.0,
            motion_bonus: 5.0,
        }
    }
}
