//! Face Detection Backends
//!
//! One capability, three strategies:
//! - `ModelBackend`: ONNX face detector run through tract
//! - `NativeBackend`: a platform face-detection primitive supplied by the host
//! - `HeuristicBackend`: pixel statistics (brightness, spread, motion)
//!
//! `BackendSelector` picks exactly one at construction, in that order.

pub mod config;
pub mod heuristic;
pub mod model;
pub mod native;
pub mod selector;

pub use config::{DetectionConfig, HeuristicConfig, ModelConfig};
pub use heuristic::HeuristicBackend;
pub use model::ModelBackend;
pub use native::{NativeBackend, PlatformFaceDetector};
pub use selector::BackendSelector;

use async_trait::async_trait;
use camera_capture::VideoFrame;
use feature_engine::FrameFeatures;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Backend initialization errors (recovered by the fallback chain)
#[derive(Error, Debug)]
pub enum BackendInitError {
    #[error("Model loading failed: {0}")]
    ModelLoad(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// Per-frame detection errors (treated as a non-detection for that tick)
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    #[error("Detection timed out after {0}ms")]
    Timeout(u64),

    #[error("Previous detection still running")]
    Busy,

    #[error("Platform detector failed: {0}")]
    Platform(String),
}

/// Which strategy produced a detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BackendKind {
    Model,
    Native,
    Heuristic,
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendKind::Model => write!(f, "model"),
            BackendKind::Native => write!(f, "native"),
            BackendKind::Heuristic => write!(f, "heuristic"),
        }
    }
}

/// Face bounding box in frame pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    /// Box of the given size centered on a point
    pub fn centered_at(center_x: f64, center_y: f64, width: f64, height: f64) -> Self {
        Self::new(center_x - width / 2.0, center_y - height / 2.0, width, height)
    }

    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }
}

/// One backend's verdict for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub detected: bool,
    /// Confidence (0-100)
    pub confidence: f64,
    /// Face location, when the backend localizes faces
    pub bbox: Option<BoundingBox>,
}

impl Detection {
    /// A non-detection
    pub fn none() -> Self {
        Self {
            detected: false,
            confidence: 0.0,
            bbox: None,
        }
    }

    /// A positive detection; confidence is clamped to [0, 100]
    pub fn found(confidence: f64, bbox: Option<BoundingBox>) -> Self {
        Self {
            detected: true,
            confidence: clamp_confidence(confidence),
            bbox,
        }
    }
}

/// Clamp to the 0-100 confidence scale; NaN becomes 0
pub fn clamp_confidence(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

/// Face detection capability.
///
/// Availability is queried once when the engine picks its backend; `detect`
/// is then called once per tick and never concurrently.
#[async_trait]
pub trait FaceDetect: Send {
    /// Strategy implemented by this backend
    fn kind(&self) -> BackendKind;

    /// Whether the backend can run on this host
    fn is_available(&self) -> bool;

    /// Detect a face in one frame
    async fn detect(
        &mut self,
        frame: &VideoFrame,
        features: &FrameFeatures,
    ) -> Result<Detection, DetectError>;
}
