//! Discrete gesture classification over recent face positions

use feature_engine::StatisticalFeatures;
use ring_buffer::RingBuffer;
use serde::{Deserialize, Serialize};

use crate::config::GestureConfig;
use crate::posture::PositionSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Gesture {
    #[default]
    None,
    Nod,
    Shake,
    HandRaise,
}

/// Stateless: each call looks only at the last `window` samples
#[derive(Debug, Clone, Default)]
pub struct GestureClassifier {
    config: GestureConfig,
}

impl GestureClassifier {
    pub fn new(config: GestureConfig) -> Self {
        Self { config }
    }

    pub fn classify(&self, history: &RingBuffer<PositionSample>) -> Gesture {
        let cfg = &self.config;
        if history.len() < cfg.window {
            return Gesture::None;
        }

        let recent: Vec<&PositionSample> = history.last_n(cfg.window).collect();
        let xs: Vec<f64> = recent.iter().map(|p| p.x).collect();
        let ys: Vec<f64> = recent.iter().map(|p| p.y).collect();
        let dx = StatisticalFeatures::compute(&StatisticalFeatures::deltas(&xs));
        let dy = StatisticalFeatures::compute(&StatisticalFeatures::deltas(&ys));

        if dy.mean.abs() > cfg.min_mean_step
            && dy.variance > cfg.min_axis_variance
            && dx.variance < cfg.max_cross_variance
        {
            return Gesture::Nod;
        }

        if dx.mean.abs() > cfg.min_mean_step
            && dx.variance > cfg.min_axis_variance
            && dy.variance < cfg.max_cross_variance
        {
            return Gesture::Shake;
        }

        let rise = match (ys.first(), ys.last()) {
            (Some(first), Some(last)) => first - last,
            _ => 0.0,
        };
        if rise > cfg.hand_raise_rise && dy.variance < cfg.hand_raise_max_variance {
            return Gesture::HandRaise;
        }

        Gesture::None
    }
}
