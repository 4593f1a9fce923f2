//! Camera Capture Library for the Presence Engine
//!
//! Provides the frame source side of engagement tracking:
//! - `VideoFrame`, the decoded RGB frame every stage consumes
//! - `CaptureDevice`, the async device interface a host implements
//! - `ReplayCamera`, a deterministic source backed by memory or image files

pub mod device;
pub mod frame;
pub mod replay;

pub use device::CaptureDevice;
pub use frame::{luminance, VideoFrame};
pub use replay::ReplayCamera;

use thiserror::Error;

/// Camera error types
///
/// The first four variants are the user-facing categories a host shows when
/// tracking cannot start.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CameraError {
    #[error("No camera detected: {0}")]
    DeviceNotFound(String),

    #[error("Camera access denied: {0}")]
    PermissionDenied(String),

    #[error("Camera is in use by another application: {0}")]
    DeviceBusy(String),

    #[error("Failed to start camera stream: {0}")]
    StreamStart(String),

    #[error("Camera stream ended")]
    StreamEnded,

    #[error("Camera not opened")]
    NotOpened,
}

/// Coarse category of a [`CameraError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraErrorKind {
    DeviceNotFound,
    PermissionDenied,
    DeviceBusy,
    StreamStart,
    StreamEnded,
    NotOpened,
}

impl CameraError {
    /// Category of this error
    pub fn kind(&self) -> CameraErrorKind {
        match self {
            CameraError::DeviceNotFound(_) => CameraErrorKind::DeviceNotFound,
            CameraError::PermissionDenied(_) => CameraErrorKind::PermissionDenied,
            CameraError::DeviceBusy(_) => CameraErrorKind::DeviceBusy,
            CameraError::StreamStart(_) => CameraErrorKind::StreamStart,
            CameraError::StreamEnded => CameraErrorKind::StreamEnded,
            CameraError::NotOpened => CameraErrorKind::NotOpened,
        }
    }

    /// Whether the error ends the stream without being a failure
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self, CameraError::StreamEnded)
    }
}

/// Camera configuration
#[derive(Debug, Clone)]
pub struct CameraConfig {
    /// Device identifier (path, index or directory for replay)
    pub device: String,
    /// Capture width
    pub width: u32,
    /// Capture height
    pub height: u32,
    /// Target FPS
    pub fps: u32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 640,
            height: 480,
            fps: 10,
        }
    }
}

impl CameraConfig {
    /// Frame interval in milliseconds for the configured FPS
    pub fn frame_interval_ms(&self) -> u64 {
        1000 / u64::from(self.fps.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kind() {
        let err = CameraError::PermissionDenied("user declined".into());
        assert_eq!(err.kind(), CameraErrorKind::PermissionDenied);
        assert!(!err.is_end_of_stream());
        assert!(CameraError::StreamEnded.is_end_of_stream());
    }

    #[test]
    fn test_frame_interval() {
        assert_eq!(CameraConfig::default().frame_interval_ms(), 100);
        let zero = CameraConfig { fps: 0, ..Default::default() };
        assert_eq!(zero.frame_interval_ms(), 1000);
    }
}
