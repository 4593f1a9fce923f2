//! Statistical Features Computation

/// Statistical features for a signal
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatisticalFeatures {
    /// Number of values
    pub count: usize,
    /// Mean value
    pub mean: f64,
    /// Population variance
    pub variance: f64,
    /// Standard deviation
    pub std_dev: f64,
    /// Minimum value
    pub min: f64,
    /// Maximum value
    pub max: f64,
    /// Rate of change (mean absolute step)
    pub rate_of_change: f64,
}

impl StatisticalFeatures {
    /// Compute statistical features from a slice of values
    pub fn compute(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;

        let mean = values.iter().sum::<f64>() / n;

        let min = values.iter().cloned().fold(f64::MAX, f64::min);
        let max = values.iter().cloned().fold(f64::MIN, f64::max);

        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std_dev = variance.sqrt();

        let rate_of_change = if values.len() >= 2 {
            let total_change: f64 = values.windows(2).map(|w| (w[1] - w[0]).abs()).sum();
            total_change / (values.len() - 1) as f64
        } else {
            0.0
        };

        Self {
            count: values.len(),
            mean,
            variance,
            std_dev,
            min,
            max,
            rate_of_change,
        }
    }

    /// Successive differences of a series (`values[i] - values[i - 1]`)
    pub fn deltas(values: &[f64]) -> Vec<f64> {
        values.windows(2).map(|w| w[1] - w[0]).collect()
    }
}
