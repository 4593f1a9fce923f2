//! Per-frame feature assembly

use camera_capture::VideoFrame;
use tracing::trace;

use crate::sampling::{FrameStats, LumaSamples, MotionStats, SamplingGrid};

/// Features computed once per tick, independent of the detection backend
#[derive(Debug, Clone, PartialEq)]
pub struct FrameFeatures {
    /// Brightness statistics
    pub stats: FrameStats,
    /// Grid samples of this frame
    pub samples: LumaSamples,
    /// Difference against the previous frame, when comparable
    pub motion: Option<MotionStats>,
}

/// Samples each frame and keeps the previous samples for motion
#[derive(Debug, Clone, Default)]
pub struct FrameFeatureAnalyzer {
    grid: SamplingGrid,
    previous: Option<LumaSamples>,
}

impl FrameFeatureAnalyzer {
    /// Create a new analyzer over the given sampling grid
    pub fn new(grid: SamplingGrid) -> Self {
        Self {
            grid,
            previous: None,
        }
    }

    /// Analyze one frame
    pub fn analyze(&mut self, frame: &VideoFrame) -> FrameFeatures {
        let samples = self.grid.sample(frame);
        let stats = FrameStats::from_samples(&samples);
        let motion = self
            .previous
            .as_ref()
            .and_then(|prev| MotionStats::between(prev, &samples));

        trace!(
            sequence = frame.sequence,
            brightness = stats.brightness_mean,
            std_dev = stats.brightness_std_dev,
            "Frame sampled"
        );

        if !samples.is_empty() {
            self.previous = Some(samples.clone());
        }

        FrameFeatures {
            stats,
            samples,
            motion,
        }
    }

    /// Forget the previous frame
    pub fn reset(&mut self) {
        self.previous = None;
    }
}
