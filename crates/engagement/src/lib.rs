//! Presence & Engagement Inference
//!
//! Turns a stream of camera frames into one `EngagementSnapshot` per tick:
//! - Debounced presence with smoothed confidence
//! - Posture and gesture classification from face positions
//! - Focus score and movement level
//! - Lighting quality
//!
//! `EngagementEngine` processes single frames; `TrackingSession` drives it
//! from a capture device on a timer and delivers snapshots to a sink.

pub mod config;
pub mod confidence;
pub mod engine;
pub mod extractor;
pub mod gesture;
pub mod observation;
pub mod posture;
pub mod scorer;
pub mod session;
pub mod snapshot;
pub mod stabilizer;

pub use config::{EngineConfig, GestureConfig, PostureConfig, ScoringConfig, StabilizerConfig};
pub use engine::EngagementEngine;
pub use extractor::FeatureExtractor;
pub use gesture::{Gesture, GestureClassifier};
pub use observation::RawObservation;
pub use posture::{PositionSample, Posture, PostureClassifier};
pub use scorer::{EngagementScorer, MovementLevel};
pub use session::{ChannelSink, SessionEnd, SessionSummary, SnapshotSink, TrackingSession};
pub use snapshot::EngagementSnapshot;
pub use stabilizer::{PresenceState, StabilizedPresence, Stabilizer};

use camera_capture::CameraError;
use thiserror::Error;

/// Configuration errors; raised before any tick runs
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {field} {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("Configuration load failed: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Engine and session errors
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Tracking task failed: {0}")]
    Task(String),
}
