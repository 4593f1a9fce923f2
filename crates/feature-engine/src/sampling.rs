//! Grid sampling of frame pixels

use camera_capture::{luminance, VideoFrame};
use serde::{Deserialize, Serialize};

use crate::statistics::StatisticalFeatures;

/// Per-sample weighted difference above which a sample counts as changed
pub const CHANGED_DIFF: f64 = 10.0;

/// Per-sample weighted difference above which a change is significant
pub const SIGNIFICANT_DIFF: f64 = 25.0;

/// Sampling grid: one pixel at the center of each cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingGrid {
    pub columns: u32,
    pub rows: u32,
}

impl Default for SamplingGrid {
    fn default() -> Self {
        Self {
            columns: 32,
            rows: 24,
        }
    }
}

impl SamplingGrid {
    /// Sample the frame at cell centers. A malformed frame yields no samples.
    pub fn sample(&self, frame: &VideoFrame) -> LumaSamples {
        if !frame.is_well_formed() || self.columns == 0 || self.rows == 0 {
            return LumaSamples::empty(frame.width, frame.height);
        }

        let cols = self.columns.min(frame.width);
        let rows = self.rows.min(frame.height);
        let cell_w = f64::from(frame.width) / f64::from(cols);
        let cell_h = f64::from(frame.height) / f64::from(rows);

        let mut rgb = Vec::with_capacity((cols * rows) as usize);
        for row in 0..rows {
            let y = (((f64::from(row) + 0.5) * cell_h) as u32).min(frame.height - 1);
            for col in 0..cols {
                let x = (((f64::from(col) + 0.5) * cell_w) as u32).min(frame.width - 1);
                if let Some(px) = frame.get_pixel(x, y) {
                    rgb.push(px);
                }
            }
        }

        let luma = rgb.iter().copied().map(luminance).collect();
        LumaSamples {
            width: frame.width,
            height: frame.height,
            rgb,
            luma,
        }
    }
}

/// Pixels sampled from one frame
#[derive(Debug, Clone, PartialEq)]
pub struct LumaSamples {
    /// Source frame width
    pub width: u32,
    /// Source frame height
    pub height: u32,
    /// Sampled RGB values, row-major over the grid
    pub rgb: Vec<[u8; 3]>,
    /// Perceived luminance of each sample
    pub luma: Vec<f64>,
}

impl LumaSamples {
    fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            rgb: Vec::new(),
            luma: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.luma.len()
    }

    pub fn is_empty(&self) -> bool {
        self.luma.is_empty()
    }
}

/// Brightness statistics of one frame (0-255 scale)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameStats {
    pub brightness_mean: f64,
    pub brightness_std_dev: f64,
    pub sample_count: usize,
}

impl FrameStats {
    pub fn from_samples(samples: &LumaSamples) -> Self {
        let stats = StatisticalFeatures::compute(&samples.luma);
        Self {
            brightness_mean: stats.mean,
            brightness_std_dev: stats.std_dev,
            sample_count: stats.count,
        }
    }
}

/// Frame-to-frame difference over the sampling grid
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct MotionStats {
    /// Share of samples whose weighted difference exceeds [`CHANGED_DIFF`]
    pub changed_ratio: f64,
    /// Share of samples whose weighted difference exceeds [`SIGNIFICANT_DIFF`]
    pub significant_ratio: f64,
    /// Mean weighted difference
    pub mean_diff: f64,
}

impl MotionStats {
    /// Compare two sample sets taken from same-sized frames.
    ///
    /// Returns `None` when the grids are not comparable.
    pub fn between(previous: &LumaSamples, current: &LumaSamples) -> Option<Self> {
        if previous.is_empty()
            || previous.rgb.len() != current.rgb.len()
            || previous.width != current.width
            || previous.height != current.height
        {
            return None;
        }

        let mut changed = 0usize;
        let mut significant = 0usize;
        let mut total = 0.0;

        for (a, b) in previous.rgb.iter().zip(&current.rgb) {
            let dr = f64::from(a[0].abs_diff(b[0]));
            let dg = f64::from(a[1].abs_diff(b[1]));
            let db = f64::from(a[2].abs_diff(b[2]));
            let diff = 0.299 * dr + 0.587 * dg + 0.114 * db;

            if diff > CHANGED_DIFF {
                changed += 1;
            }
            if diff > SIGNIFICANT_DIFF {
                significant += 1;
            }
            total += diff;
        }

        let n = current.rgb.len() as f64;
        Some(Self {
            changed_ratio: changed as f64 / n,
            significant_ratio: significant as f64 / n,
            mean_diff: total / n,
        })
    }
}
