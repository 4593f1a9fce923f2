//! Feature Engineering Engine
//!
//! Provides per-frame statistics for presence detection: grid-sampled
//! luminance, brightness mean and spread, frame-to-frame motion and a
//! rolling throughput counter.

mod features;
mod sampling;
mod statistics;
mod throughput;

pub use features::{FrameFeatureAnalyzer, FrameFeatures};
pub use sampling::{FrameStats, LumaSamples, MotionStats, SamplingGrid};
pub use statistics::StatisticalFeatures;
pub use throughput::ThroughputCounter;
