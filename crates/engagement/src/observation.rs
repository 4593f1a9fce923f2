//! Per-tick raw observation

use camera_capture::VideoFrame;
use face_detect::{BoundingBox, Detection};
use feature_engine::FrameStats;
use ring_buffer::Timestamped;
use serde::{Deserialize, Serialize};

/// One backend verdict plus frame statistics; created once per tick and
/// never changed afterwards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawObservation {
    pub detected: bool,
    /// Confidence (0-100)
    pub confidence: f64,
    pub bounding_box: Option<BoundingBox>,
    pub frame_brightness_mean: f64,
    pub frame_brightness_std_dev: f64,
    pub frame_width: u32,
    pub frame_height: u32,
    /// Capture time (milliseconds)
    pub captured_at: u64,
}

impl RawObservation {
    pub fn new(frame: &VideoFrame, stats: &FrameStats, detection: Detection) -> Self {
        Self {
            detected: detection.detected,
            confidence: if detection.detected {
                face_detect::clamp_confidence(detection.confidence)
            } else {
                0.0
            },
            bounding_box: detection.bbox.filter(|_| detection.detected),
            frame_brightness_mean: stats.brightness_mean,
            frame_brightness_std_dev: stats.brightness_std_dev,
            frame_width: frame.width,
            frame_height: frame.height,
            captured_at: frame.timestamp_ms,
        }
    }

    /// Copy with a different confidence
    pub fn with_confidence(&self, confidence: f64) -> Self {
        Self {
            confidence: face_detect::clamp_confidence(confidence),
            ..*self
        }
    }

    /// Face area over frame area, when localized
    pub fn face_ratio(&self) -> Option<f64> {
        let frame_area = f64::from(self.frame_width) * f64::from(self.frame_height);
        match self.bounding_box {
            Some(bbox) if frame_area > 0.0 => Some(bbox.area() / frame_area),
            _ => None,
        }
    }
}

impl Timestamped for RawObservation {
    fn timestamp_ms(&self) -> u64 {
        self.captured_at
    }
}
