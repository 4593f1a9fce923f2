//! Backend selection with fallback
//!
//! Preference order is model, native, heuristic. The heuristic needs nothing
//! from the host, so selection always yields a backend.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::config::{DetectionConfig, HeuristicConfig};
use crate::{
    BackendInitError, FaceDetect, HeuristicBackend, ModelBackend, NativeBackend,
    PlatformFaceDetector,
};

/// Candidate backend: a constructed backend or the reason it could not be
pub type Candidate = Result<Box<dyn FaceDetect>, BackendInitError>;

/// Picks one backend for the lifetime of an engine
pub struct BackendSelector;

impl BackendSelector {
    /// Select the best available backend for this configuration.
    ///
    /// `platform` is the host's face-detection primitive, if it has one.
    pub fn select(
        config: &DetectionConfig,
        platform: Option<Arc<dyn PlatformFaceDetector>>,
    ) -> Box<dyn FaceDetect> {
        let model = ModelBackend::load(&config.model).map(|b| Box::new(b) as Box<dyn FaceDetect>);

        let native = match (config.enable_native, platform) {
            (false, _) => Err(BackendInitError::Unavailable("native detection disabled".into())),
            (true, None) => Err(BackendInitError::Unavailable(
                "no platform detector on this host".into(),
            )),
            (true, Some(p)) => NativeBackend::new(p).map(|b| Box::new(b) as Box<dyn FaceDetect>),
        };

        Self::first_available(vec![model, native], config.heuristic.clone())
    }

    /// First candidate that constructed and reports itself available,
    /// falling back to the heuristic when none does.
    pub fn first_available(candidates: Vec<Candidate>, heuristic: HeuristicConfig) -> Box<dyn FaceDetect> {
        let start = Instant::now();

        for candidate in candidates {
            match candidate {
                Ok(backend) if backend.is_available() => {
                    info!(
                        "Selected {} face detection backend in {}ms",
                        backend.kind(),
                        start.elapsed().as_millis()
                    );
                    return backend;
                }
                Ok(backend) => {
                    debug!("{} backend reports unavailable", backend.kind());
                }
                Err(e) => {
                    debug!("Backend skipped: {}", e);
                }
            }
        }

        warn!(
            "Using heuristic face detection backend. No model or platform detector available; \
             accuracy may be reduced."
        );
        Box::new(HeuristicBackend::new(heuristic))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BackendKind, BoundingBox, DetectError};
    use camera_capture::VideoFrame;

    struct StubPlatform {
        supported: bool,
    }

    impl PlatformFaceDetector for StubPlatform {
        fn name(&self) -> &str {
            "stub"
        }

        fn is_supported(&self) -> bool {
            self.supported
        }

        fn detect_faces(&self, _frame: &VideoFrame) -> Result<Vec<BoundingBox>, DetectError> {
            Ok(vec![])
        }
    }

    #[test]
    fn test_defaults_fall_back_to_heuristic() {
        let backend = BackendSelector::select(&DetectionConfig::default(), None);
        assert_eq!(backend.kind(), BackendKind::Heuristic);
        assert!(backend.is_available());
    }

    #[test]
    fn test_native_preferred_over_heuristic() {
        let platform = Arc::new(StubPlatform { supported: true });
        let backend = BackendSelector::select(&DetectionConfig::default(), Some(platform));
        assert_eq!(backend.kind(), BackendKind::Native);
    }

    #[test]
    fn test_native_disabled() {
        let platform = Arc::new(StubPlatform { supported: true });
        let backend = BackendSelector::select(&DetectionConfig::heuristic_only(), Some(platform));
        assert_eq!(backend.kind(), BackendKind::Heuristic);
    }

    #[test]
    fn test_unsupported_platform_falls_through() {
        let platform = Arc::new(StubPlatform { supported: false });
        let backend = BackendSelector::select(&DetectionConfig::default(), Some(platform));
        assert_eq!(backend.kind(), BackendKind::Heuristic);
    }

    #[test]
    fn test_failed_model_falls_through_to_native() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = DetectionConfig::default();
        config.model.model_path = Some(dir.path().join("face.onnx"));

        let platform = Arc::new(StubPlatform { supported: true });
        let backend = BackendSelector::select(&config, Some(platform));
        assert_eq!(backend.kind(), BackendKind::Native);
    }
}
