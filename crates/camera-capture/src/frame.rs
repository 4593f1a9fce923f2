//! Video frame types and processing

/// Perceived luminance of an RGB pixel (0.299 R + 0.587 G + 0.114 B)
#[inline]
pub fn luminance(rgb: [u8; 3]) -> f64 {
    0.299 * f64::from(rgb[0]) + 0.587 * f64::from(rgb[1]) + 0.114 * f64::from(rgb[2])
}

/// Decoded RGB video frame
#[derive(Debug, Clone, PartialEq)]
pub struct VideoFrame {
    /// RGB pixel data (width * height * 3)
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture timestamp (milliseconds, source clock)
    pub timestamp_ms: u64,
    /// Frame sequence number
    pub sequence: u32,
}

impl VideoFrame {
    /// Create a new video frame from raw RGB data
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp_ms: u64, sequence: u32) -> Self {
        Self {
            data,
            width,
            height,
            timestamp_ms,
            sequence,
        }
    }

    /// Create a frame filled with a single color
    pub fn solid(width: u32, height: u32, rgb: [u8; 3], timestamp_ms: u64, sequence: u32) -> Self {
        let data = rgb
            .iter()
            .copied()
            .cycle()
            .take((width * height * 3) as usize)
            .collect();
        Self::new(data, width, height, timestamp_ms, sequence)
    }

    /// Wrap a decoded image
    pub fn from_image(img: &image::DynamicImage, timestamp_ms: u64, sequence: u32) -> Self {
        let rgb = img.to_rgb8();
        let (width, height) = rgb.dimensions();
        Self::new(rgb.into_raw(), width, height, timestamp_ms, sequence)
    }

    /// Whether the buffer length matches the declared dimensions
    pub fn is_well_formed(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == (self.width * self.height * 3) as usize
    }

    /// Frame area in pixels
    pub fn area(&self) -> f64 {
        f64::from(self.width) * f64::from(self.height)
    }

    /// Get pixel at (x, y)
    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        let px = self.data.get(idx..idx + 3)?;
        Some([px[0], px[1], px[2]])
    }

    /// Luminance at (x, y)
    pub fn luminance_at(&self, x: u32, y: u32) -> Option<f64> {
        self.get_pixel(x, y).map(luminance)
    }

    /// Resize frame (nearest neighbor)
    pub fn resize(&self, new_width: u32, new_height: u32) -> VideoFrame {
        let mut resized = Vec::with_capacity((new_width * new_height * 3) as usize);

        let x_ratio = self.width as f32 / new_width as f32;
        let y_ratio = self.height as f32 / new_height as f32;

        for y in 0..new_height {
            for x in 0..new_width {
                let src_x = (x as f32 * x_ratio).floor() as u32;
                let src_y = (y as f32 * y_ratio).floor() as u32;

                match self.get_pixel(
                    src_x.min(self.width.saturating_sub(1)),
                    src_y.min(self.height.saturating_sub(1)),
                ) {
                    Some(pixel) => resized.extend_from_slice(&pixel),
                    None => resized.extend_from_slice(&[0, 0, 0]),
                }
            }
        }

        VideoFrame {
            data: resized,
            width: new_width,
            height: new_height,
            timestamp_ms: self.timestamp_ms,
            sequence: self.sequence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_luminance_weights() {
        assert!((luminance([255, 255, 255]) - 255.0).abs() < 1e-9);
        assert_eq!(luminance([0, 0, 0]), 0.0);
        assert!((luminance([100, 0, 0]) - 29.9).abs() < 1e-9);
    }

    #[test]
    fn test_solid_frame() {
        let frame = VideoFrame::solid(4, 3, [10, 20, 30], 0, 0);
        assert!(frame.is_well_formed());
        assert_eq!(frame.get_pixel(3, 2), Some([10, 20, 30]));
        assert_eq!(frame.get_pixel(4, 0), None);
    }

    #[test]
    fn test_truncated_buffer_is_not_well_formed() {
        let frame = VideoFrame::new(vec![0; 10], 4, 4, 0, 0);
        assert!(!frame.is_well_formed());
        assert_eq!(frame.get_pixel(3, 3), None);
    }

    #[test]
    fn test_resize_keeps_metadata() {
        let frame = VideoFrame::solid(64, 48, [200, 200, 200], 1234, 7);
        let small = frame.resize(16, 12);
        assert!(small.is_well_formed());
        assert_eq!(small.timestamp_ms, 1234);
        assert_eq!(small.sequence, 7);
        assert_eq!(small.get_pixel(15, 11), Some([200, 200, 200]));
    }
}
