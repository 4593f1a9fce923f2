//! Rolling throughput (FPS) counter for diagnostics

use tracing::debug;

/// Window over which frames are counted
const WINDOW_MS: u64 = 1000;

/// Counts processed frames and reports frames per second once per window.
///
/// The frame that opens a window only marks its start; frames after it are
/// counted, up to and including the one that closes the window.
#[derive(Debug, Clone, Default)]
pub struct ThroughputCounter {
    window_start_ms: Option<u64>,
    frames_in_window: u32,
    fps: f64,
}

impl ThroughputCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one processed frame at `now_ms`
    pub fn record(&mut self, now_ms: u64) {
        let Some(start) = self.window_start_ms else {
            self.window_start_ms = Some(now_ms);
            return;
        };

        self.frames_in_window += 1;
        let elapsed = now_ms.saturating_sub(start);
        if elapsed >= WINDOW_MS {
            self.fps = f64::from(self.frames_in_window) * 1000.0 / elapsed as f64;
            self.frames_in_window = 0;
            self.window_start_ms = Some(now_ms);

            metrics::gauge!("presence_engine_fps").set(self.fps);
            debug!(fps = self.fps, "Throughput updated");
        }
    }

    /// Most recent FPS measurement (0 until a full window elapsed)
    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fps_at_ten_hz() {
        let mut counter = ThroughputCounter::new();
        let mut first_window = None;
        for i in 0..=30 {
            counter.record(i * 100);
            if i == 10 {
                first_window = Some(counter.fps());
            }
        }
        assert_eq!(first_window, Some(10.0));
        assert!((counter.fps() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_fps_at_five_hz() {
        let mut counter = ThroughputCounter::new();
        for i in 0..=5 {
            counter.record(1_000 + i * 200);
        }
        assert!((counter.fps() - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_fps_before_full_window() {
        let mut counter = ThroughputCounter::new();
        counter.record(0);
        counter.record(500);
        assert_eq!(counter.fps(), 0.0);
    }

    #[test]
    fn test_reset() {
        let mut counter = ThroughputCounter::new();
        counter.record(0);
        counter.record(1500);
        counter.reset();
        assert_eq!(counter.fps(), 0.0);
        counter.record(2000);
        counter.record(2500);
        assert_eq!(counter.fps(), 0.0);
    }
}
