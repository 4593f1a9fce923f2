//! Platform face detector adapter

use std::sync::Arc;

use async_trait::async_trait;
use camera_capture::VideoFrame;
use feature_engine::FrameFeatures;
use tracing::trace;

use crate::{BackendInitError, BackendKind, BoundingBox, DetectError, Detection, FaceDetect};

/// Confidence reported for platform detections
pub const NATIVE_CONFIDENCE: f64 = 90.0;

/// Face-detection primitive provided by the host platform
pub trait PlatformFaceDetector: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Whether the primitive works on this host
    fn is_supported(&self) -> bool {
        true
    }

    /// All faces in the frame, in frame pixels
    fn detect_faces(&self, frame: &VideoFrame) -> Result<Vec<BoundingBox>, DetectError>;
}

/// Backend wrapping a `PlatformFaceDetector`
pub struct NativeBackend {
    platform: Arc<dyn PlatformFaceDetector>,
}

impl NativeBackend {
    pub fn new(platform: Arc<dyn PlatformFaceDetector>) -> Result<Self, BackendInitError> {
        if !platform.is_supported() {
            return Err(BackendInitError::Unavailable(format!(
                "platform detector '{}' not supported on this host",
                platform.name()
            )));
        }
        Ok(Self { platform })
    }

    pub fn platform_name(&self) -> &str {
        self.platform.name()
    }
}

#[async_trait]
impl FaceDetect for NativeBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Native
    }

    fn is_available(&self) -> bool {
        self.platform.is_supported()
    }

    async fn detect(
        &mut self,
        frame: &VideoFrame,
        _features: &FrameFeatures,
    ) -> Result<Detection, DetectError> {
        let faces = self.platform.detect_faces(frame)?;
        trace!(faces = faces.len(), "Platform detection");

        // Multiple faces: the first one reported is tracked
        Ok(match faces.first() {
            Some(face) => Detection::found(NATIVE_CONFIDENCE, Some(*face)),
            None => Detection::none(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_engine::FrameFeatureAnalyzer;

    struct FixedFaces {
        faces: Vec<BoundingBox>,
        supported: bool,
    }

    impl PlatformFaceDetector for FixedFaces {
        fn name(&self) -> &str {
            "fixed"
        }

        fn is_supported(&self) -> bool {
            self.supported
        }

        fn detect_faces(&self, _frame: &VideoFrame) -> Result<Vec<BoundingBox>, DetectError> {
            Ok(self.faces.clone())
        }
    }

    #[tokio::test]
    async fn test_first_face_is_reported() {
        let first = BoundingBox::new(10.0, 10.0, 50.0, 50.0);
        let platform = Arc::new(FixedFaces {
            faces: vec![first, BoundingBox::new(200.0, 10.0, 80.0, 80.0)],
            supported: true,
        });
        let mut backend = NativeBackend::new(platform).unwrap();
        let frame = VideoFrame::solid(320, 240, [100, 100, 100], 0, 0);
        let features = FrameFeatureAnalyzer::default().analyze(&frame);

        let detection = backend.detect(&frame, &features).await.unwrap();
        assert!(detection.detected);
        assert_eq!(detection.confidence, NATIVE_CONFIDENCE);
        assert_eq!(detection.bbox, Some(first));
    }

    #[tokio::test]
    async fn test_no_faces() {
        let platform = Arc::new(FixedFaces {
            faces: vec![],
            supported: true,
        });
        let mut backend = NativeBackend::new(platform).unwrap();
        let frame = VideoFrame::solid(32, 24, [0, 0, 0], 0, 0);
        let features = FrameFeatureAnalyzer::default().analyze(&frame);
        assert_eq!(backend.detect(&frame, &features).await.unwrap(), Detection::none());
    }

    #[test]
    fn test_unsupported_platform_rejected() {
        let platform = Arc::new(FixedFaces {
            faces: vec![],
            supported: false,
        });
        assert!(matches!(
            NativeBackend::new(platform),
            Err(BackendInitError::Unavailable(_))
        ));
    }
}
