//! Frame feature extraction
//!
//! Samples the frame, runs the active backend under a timeout and packages
//! the result as a `RawObservation`. Backend failures never escape: they
//! become a non-detection for that tick.

use std::time::Duration;

use camera_capture::VideoFrame;
use face_detect::{BackendKind, DetectError, Detection, FaceDetect};
use feature_engine::{FrameFeatureAnalyzer, SamplingGrid, ThroughputCounter};
use tokio::time::timeout;
use tracing::warn;

use crate::observation::RawObservation;

/// Runs one backend against frames
pub struct FeatureExtractor {
    backend: Box<dyn FaceDetect>,
    analyzer: FrameFeatureAnalyzer,
    throughput: ThroughputCounter,
    timeout: Duration,
    failures: u64,
}

impl FeatureExtractor {
    pub fn new(backend: Box<dyn FaceDetect>, grid: SamplingGrid, timeout: Duration) -> Self {
        Self {
            backend,
            analyzer: FrameFeatureAnalyzer::new(grid),
            throughput: ThroughputCounter::new(),
            timeout,
            failures: 0,
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    /// Detection failures (errors and timeouts) so far
    pub fn failures(&self) -> u64 {
        self.failures
    }

    /// Frames per second measured over the last second of frames
    pub fn fps(&self) -> f64 {
        self.throughput.fps()
    }

    /// Extract one observation
    pub async fn extract(&mut self, frame: &VideoFrame) -> RawObservation {
        let features = self.analyzer.analyze(frame);
        self.throughput.record(frame.timestamp_ms);

        let result = match timeout(self.timeout, self.backend.detect(frame, &features)).await {
            Ok(result) => result,
            Err(_) => Err(DetectError::Timeout(self.timeout.as_millis() as u64)),
        };

        let detection = match result {
            Ok(detection) => detection,
            Err(e) => {
                self.failures += 1;
                metrics::counter!("presence_engine_detection_failures_total").increment(1);
                warn!(
                    backend = %self.backend.kind(),
                    sequence = frame.sequence,
                    error = %e,
                    "Detection failed, reporting no face for this tick"
                );
                Detection::none()
            }
        };

        RawObservation::new(frame, &features.stats, detection)
    }

    pub fn reset(&mut self) {
        self.analyzer.reset();
        self.throughput.reset();
        self.failures = 0;
    }
}
