//! Temporal presence stabilization
//!
//! Debounces per-tick detections with hysteresis over a time window so the
//! reported presence does not flicker on single misses.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::StabilizerConfig;
use crate::observation::RawObservation;

/// Debounced presence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PresenceState {
    #[default]
    OutOfFrame,
    InFrame,
}

impl PresenceState {
    pub fn is_in_frame(&self) -> bool {
        matches!(self, PresenceState::InFrame)
    }
}

/// Stabilizer output for one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilizedPresence {
    pub state: PresenceState,
    /// Mean confidence of positive observations in the window; 0 if none
    pub confidence: f64,
    pub detections: usize,
    pub misses: usize,
    /// Whether `state` changed on this tick
    pub changed: bool,
}

/// Hysteresis state machine over the observation window
#[derive(Debug, Clone)]
pub struct Stabilizer {
    config: StabilizerConfig,
    state: PresenceState,
}

impl Stabilizer {
    pub fn new(config: StabilizerConfig) -> Self {
        Self {
            config,
            state: PresenceState::OutOfFrame,
        }
    }

    pub fn state(&self) -> PresenceState {
        self.state
    }

    /// Evaluate the current window (every observation within the time window)
    pub fn update<'a, I>(&mut self, window: I) -> StabilizedPresence
    where
        I: IntoIterator<Item = &'a RawObservation>,
    {
        let mut total = 0usize;
        let mut detections = 0usize;
        let mut confidence_sum = 0.0;
        for obs in window {
            total += 1;
            if obs.detected {
                detections += 1;
                confidence_sum += obs.confidence;
            }
        }
        let misses = total - detections;

        let mut next = match self.state {
            PresenceState::OutOfFrame
                if detections >= self.config.detection_threshold as usize =>
            {
                PresenceState::InFrame
            }
            PresenceState::InFrame if misses >= self.config.non_detection_threshold as usize => {
                PresenceState::OutOfFrame
            }
            state => state,
        };

        // Lenient re-entry also holds InFrame while any positive remains
        if self.config.lenient_reentry && next == PresenceState::OutOfFrame && detections > 0 {
            next = PresenceState::InFrame;
        }

        let changed = next != self.state;
        if changed {
            info!(
                from = ?self.state,
                to = ?next,
                detections,
                misses,
                "Presence changed"
            );
        }
        self.state = next;

        let confidence = if detections > 0 {
            confidence_sum / detections as f64
        } else {
            0.0
        };

        StabilizedPresence {
            state: next,
            confidence,
            detections,
            misses,
            changed,
        }
    }

    pub fn reset(&mut self) {
        self.state = PresenceState::OutOfFrame;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn obs(detected: bool, confidence: f64, at: u64) -> RawObservation {
        RawObservation {
            detected,
            confidence: if detected { confidence } else { 0.0 },
            bounding_box: None,
            frame_brightness_mean: 100.0,
            frame_brightness_std_dev: 20.0,
            frame_width: 640,
            frame_height: 480,
            captured_at: at,
        }
    }

    /// Feed observations one tick at a time, window = everything so far
    fn run(stabilizer: &mut Stabilizer, seq: &[(bool, f64)]) -> StabilizedPresence {
        let mut history = Vec::new();
        let mut last = None;
        for (i, (d, c)) in seq.iter().enumerate() {
            history.push(obs(*d, *c, i as u64 * 100));
            last = Some(stabilizer.update(history.iter()));
        }
        last.unwrap()
    }

    #[test]
    fn test_miss_miss_hit_hit_enters_with_mean_confidence() {
        let mut stabilizer = Stabilizer::new(StabilizerConfig::default());
        let result = run(
            &mut stabilizer,
            &[(false, 0.0), (false, 0.0), (true, 80.0), (true, 85.0)],
        );
        assert_eq!(result.state, PresenceState::InFrame);
        assert!((result.confidence - 82.5).abs() < 1e-9);
    }

    #[test]
    fn test_strict_entry_needs_threshold() {
        let config = StabilizerConfig {
            lenient_reentry: false,
            ..Default::default()
        };
        let mut stabilizer = Stabilizer::new(config);
        let result = run(&mut stabilizer, &[(false, 0.0), (true, 70.0)]);
        assert_eq!(result.state, PresenceState::OutOfFrame);
        assert!((result.confidence - 70.0).abs() < 1e-9);

        let result = stabilizer.update([obs(true, 70.0, 0), obs(true, 70.0, 100)].iter());
        assert_eq!(result.state, PresenceState::InFrame);
        assert!(result.changed);
    }

    #[test]
    fn test_single_miss_does_not_exit() {
        let config = StabilizerConfig {
            lenient_reentry: false,
            ..Default::default()
        };
        let mut stabilizer = Stabilizer::new(config);
        let result = run(
            &mut stabilizer,
            &[(true, 90.0), (true, 90.0), (true, 90.0), (false, 0.0)],
        );
        assert_eq!(result.state, PresenceState::InFrame);
        assert_eq!(result.misses, 1);
    }

    #[test]
    fn test_exit_after_enough_misses() {
        let config = StabilizerConfig {
            lenient_reentry: false,
            ..Default::default()
        };
        let mut stabilizer = Stabilizer::new(config);
        run(&mut stabilizer, &[(true, 90.0), (true, 90.0)]);
        let result = stabilizer.update(
            [obs(false, 0.0, 0), obs(false, 0.0, 100), obs(false, 0.0, 200)].iter(),
        );
        assert_eq!(result.state, PresenceState::OutOfFrame);
    }

    #[test]
    fn test_lenient_holds_while_positive_in_window() {
        let mut stabilizer = Stabilizer::new(StabilizerConfig::default());
        let result = run(
            &mut stabilizer,
            &[(true, 90.0), (true, 90.0), (false, 0.0), (false, 0.0), (false, 0.0)],
        );
        assert_eq!(result.state, PresenceState::InFrame);
    }

    #[test]
    fn test_all_positive_window_confidence_exact() {
        let mut stabilizer = Stabilizer::new(StabilizerConfig::default());
        let result = run(&mut stabilizer, &[(true, 64.0); 8]);
        assert_eq!(result.confidence, 64.0);
    }

    #[test]
    fn test_no_positives_is_out_of_frame_with_zero_confidence() {
        let mut stabilizer = Stabilizer::new(StabilizerConfig::default());
        let result = run(&mut stabilizer, &[(false, 0.0); 6]);
        assert_eq!(result.state, PresenceState::OutOfFrame);
        assert_eq!(result.confidence, 0.0);
    }

    proptest! {
        #[test]
        fn prop_confidence_in_range(seq in proptest::collection::vec((any::<bool>(), 0.0f64..=100.0), 1..40)) {
            let mut stabilizer = Stabilizer::new(StabilizerConfig::default());
            let mut history = Vec::new();
            for (i, (d, c)) in seq.iter().enumerate() {
                history.push(obs(*d, *c, i as u64 * 100));
                let start = history.len().saturating_sub(20);
                let result = stabilizer.update(history[start..].iter());
                prop_assert!((0.0..=100.0).contains(&result.confidence));
            }
        }

        #[test]
        fn prop_single_miss_never_exits(prefix in 2usize..10) {
            let config = StabilizerConfig { lenient_reentry: false, ..Default::default() };
            let mut stabilizer = Stabilizer::new(config);
            let mut seq = vec![(true, 80.0); prefix];
            seq.push((false, 0.0));
            let result = run(&mut stabilizer, &seq);
            prop_assert_eq!(result.state, PresenceState::InFrame);
        }
    }
}
