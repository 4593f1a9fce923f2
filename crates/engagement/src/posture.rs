//! Face position history and posture classification

use face_detect::BoundingBox;
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};

use crate::config::PostureConfig;

/// Samples averaged for the slouch check
const SLOUCH_WINDOW: usize = 10;

/// Posture relative to the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Posture {
    Good,
    Slouching,
    TooClose,
    TooFar,
    #[default]
    Unknown,
}

/// Face center and size at one tick (frame pixels)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PositionSample {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl From<&BoundingBox> for PositionSample {
    fn from(bbox: &BoundingBox) -> Self {
        let (x, y) = bbox.center();
        Self {
            x,
            y,
            width: bbox.width,
            height: bbox.height,
        }
    }
}

impl PositionSample {
    pub fn distance_to(&self, other: &PositionSample) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Euclidean displacement between consecutive samples of the last `count`
pub fn step_lengths(history: &RingBuffer<PositionSample>, count: usize) -> Vec<f64> {
    let recent: Vec<&PositionSample> = history.last_n(count).collect();
    recent.windows(2).map(|w| w[0].distance_to(w[1])).collect()
}

/// Classifies posture from the current box and recent positions
#[derive(Debug, Clone, Default)]
pub struct PostureClassifier {
    config: PostureConfig,
}

impl PostureClassifier {
    pub fn new(config: PostureConfig) -> Self {
        Self { config }
    }

    /// Classify the current face box. `history` already holds the current
    /// sample.
    pub fn classify(
        &self,
        bbox: &BoundingBox,
        frame_width: u32,
        frame_height: u32,
        history: &RingBuffer<PositionSample>,
    ) -> Posture {
        let (fw, fh) = (f64::from(frame_width), f64::from(frame_height));
        if fw <= 0.0 || fh <= 0.0 {
            return Posture::Unknown;
        }

        let face_ratio = bbox.area() / (fw * fh);
        if face_ratio > self.config.too_close_ratio {
            return Posture::TooClose;
        }
        if face_ratio < self.config.too_far_ratio {
            return Posture::TooFar;
        }

        let (cx, cy) = bbox.center();
        let (frame_cx, frame_cy) = (fw / 2.0, fh / 2.0);
        let distance = ((cx - frame_cx).powi(2) + (cy - frame_cy).powi(2)).sqrt();
        let max_distance = fw * self.config.centered_ratio;

        if history.len() >= SLOUCH_WINDOW {
            let avg_y = history.last_n(SLOUCH_WINDOW).map(|p| p.y).sum::<f64>()
                / SLOUCH_WINDOW as f64;
            if avg_y > frame_cy * self.config.slouch_y_factor
                && distance > max_distance * self.config.slouch_distance_factor
            {
                return Posture::Slouching;
            }
        }

        if distance < max_distance {
            Posture::Good
        } else {
            Posture::Unknown
        }
    }

    /// Whether the face size is within the distance bounds
    pub fn within_distance_bounds(&self, face_ratio: f64) -> bool {
        face_ratio >= self.config.too_far_ratio && face_ratio <= self.config.too_close_ratio
    }
}
