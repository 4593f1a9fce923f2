//! Confidence adjustment for localized detections
//!
//! A face box lets the engine judge how trustworthy a detection is: jittery
//! boxes and faces at the edge of the usable distance range are damped.

use feature_engine::StatisticalFeatures;
use ring_buffer::RingBuffer;

use crate::config::PostureConfig;
use crate::posture::{step_lengths, PositionSample};

/// Positions used to judge box stability
const STABILITY_WINDOW: usize = 5;

/// Multiplier from average step length over the stability window
pub fn stability_factor(avg_movement: f64) -> f64 {
    if avg_movement < 3.0 {
        1.1
    } else if avg_movement < 8.0 {
        1.0
    } else if avg_movement > 15.0 {
        0.7
    } else {
        0.9
    }
}

/// Adjust a localized detection's confidence. `history` already holds the
/// current position.
pub fn adjust(
    raw: f64,
    history: &RingBuffer<PositionSample>,
    face_ratio: f64,
    bounds: &PostureConfig,
) -> f64 {
    let mut confidence = raw;

    if history.len() > STABILITY_WINDOW {
        let steps = step_lengths(history, STABILITY_WINDOW);
        let avg = StatisticalFeatures::compute(&steps).mean;
        confidence = (confidence * stability_factor(avg)).min(100.0);
    }

    if face_ratio < bounds.too_far_ratio {
        confidence = (confidence * 0.6).max(30.0);
    } else if face_ratio > bounds.too_close_ratio {
        confidence = (confidence * 0.7).max(40.0);
    }

    face_detect::clamp_confidence(confidence)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history(n: usize, step: f64) -> RingBuffer<PositionSample> {
        let mut history = RingBuffer::new(30);
        for i in 0..n {
            history.push(PositionSample {
                x: 100.0 + step * i as f64,
                y: 100.0,
                width: 100.0,
                height: 100.0,
            });
        }
        history
    }

    #[test]
    fn test_short_history_untouched() {
        let c = adjust(80.0, &history(5, 0.0), 0.05, &PostureConfig::default());
        assert_eq!(c, 80.0);
    }

    #[test]
    fn test_stable_box_boosted_and_capped() {
        let bounds = PostureConfig::default();
        assert!((adjust(80.0, &history(6, 0.0), 0.05, &bounds) - 88.0).abs() < 1e-9);
        assert_eq!(adjust(95.0, &history(6, 0.0), 0.05, &bounds), 100.0);
    }

    #[test]
    fn test_jittery_box_damped() {
        let c = adjust(90.0, &history(6, 20.0), 0.05, &PostureConfig::default());
        assert!((c - 63.0).abs() < 1e-9);
    }

    #[test]
    fn test_distance_damping_floors() {
        let bounds = PostureConfig::default();
        assert_eq!(adjust(40.0, &history(1, 0.0), 0.001, &bounds), 30.0);
        assert!((adjust(90.0, &history(1, 0.0), 0.001, &bounds) - 54.0).abs() < 1e-9);
        assert_eq!(adjust(50.0, &history(1, 0.0), 0.5, &bounds), 40.0);
    }

    #[test]
    fn test_factor_bands() {
        assert_eq!(stability_factor(0.0), 1.1);
        assert_eq!(stability_factor(5.0), 1.0);
        assert_eq!(stability_factor(10.0), 0.9);
        assert_eq!(stability_factor(16.0), 0.7);
    }
}
