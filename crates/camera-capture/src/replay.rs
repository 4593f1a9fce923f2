//! Replay camera: deterministic frames from memory or image files

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::{CameraConfig, CameraError, CaptureDevice, VideoFrame};

/// Image extensions picked up by [`ReplayCamera::from_dir`]
const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp"];

/// Where replay frames come from
#[derive(Debug)]
enum ReplaySource {
    Frames(Vec<VideoFrame>),
    Files(Vec<PathBuf>),
}

/// Camera that replays a fixed sequence of frames.
///
/// Frames are restamped at `1000 / fps` millisecond spacing so a replay is
/// reproducible regardless of wall-clock time. `None` entries in a scripted
/// sequence simulate a stalled capture.
#[derive(Debug)]
pub struct ReplayCamera {
    source: ReplaySource,
    fps: u32,
    pending: VecDeque<Option<usize>>,
    /// Decoded files are resized to this when set
    size: Option<(u32, u32)>,
    open: bool,
    sequence: u32,
}

impl ReplayCamera {
    /// Replay frames held in memory
    pub fn from_frames(frames: Vec<VideoFrame>, fps: u32) -> Self {
        let script = (0..frames.len()).map(Some).collect();
        Self::with_script(ReplaySource::Frames(frames), script, fps)
    }

    /// Replay frames with stalls: `None` yields no frame for that read
    pub fn scripted(frames: Vec<Option<VideoFrame>>, fps: u32) -> Self {
        let mut owned = Vec::with_capacity(frames.len());
        let mut script = VecDeque::with_capacity(frames.len());
        for frame in frames {
            match frame {
                Some(f) => {
                    script.push_back(Some(owned.len()));
                    owned.push(f);
                }
                None => script.push_back(None),
            }
        }
        Self {
            source: ReplaySource::Frames(owned),
            fps: fps.max(1),
            pending: script,
            size: None,
            open: false,
            sequence: 0,
        }
    }

    /// Replay every image file in a directory, in file name order
    pub fn from_dir(dir: impl AsRef<Path>, fps: u32) -> Result<Self, CameraError> {
        let dir = dir.as_ref();
        let entries = std::fs::read_dir(dir).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => CameraError::DeviceNotFound(dir.display().to_string()),
            std::io::ErrorKind::PermissionDenied => {
                CameraError::PermissionDenied(dir.display().to_string())
            }
            _ => CameraError::StreamStart(e.to_string()),
        })?;

        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();

        info!("Replay camera found {} frames in {}", files.len(), dir.display());
        let script = (0..files.len()).map(Some).collect();
        Ok(Self::with_script(ReplaySource::Files(files), script, fps))
    }

    /// Replay the directory named by `config.device` at the configured size and rate
    pub fn from_config(config: &CameraConfig) -> Result<Self, CameraError> {
        let mut camera = Self::from_dir(&config.device, config.fps)?;
        if config.width > 0 && config.height > 0 {
            camera.size = Some((config.width, config.height));
        }
        Ok(camera)
    }

    fn with_script(source: ReplaySource, pending: VecDeque<Option<usize>>, fps: u32) -> Self {
        Self {
            source,
            fps: fps.max(1),
            pending,
            size: None,
            open: false,
            sequence: 0,
        }
    }

    /// Frames (and stalls) not yet read
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }

    fn load(&self, index: usize) -> Result<VideoFrame, CameraError> {
        match &self.source {
            ReplaySource::Frames(frames) => frames
                .get(index)
                .cloned()
                .ok_or(CameraError::StreamEnded),
            ReplaySource::Files(files) => {
                let path = files.get(index).ok_or(CameraError::StreamEnded)?;
                let img = image::open(path)
                    .map_err(|e| CameraError::StreamStart(format!("{}: {}", path.display(), e)))?;
                let frame = VideoFrame::from_image(&img, 0, 0);
                Ok(match self.size {
                    Some((w, h)) if (w, h) != (frame.width, frame.height) => frame.resize(w, h),
                    _ => frame,
                })
            }
        }
    }

    fn frame_timestamp_ms(&self) -> u64 {
        u64::from(self.sequence) * 1000 / u64::from(self.fps)
    }
}

#[async_trait]
impl CaptureDevice for ReplayCamera {
    async fn open(&mut self) -> Result<(), CameraError> {
        if self.pending.is_empty() {
            return Err(CameraError::DeviceNotFound("replay source has no frames".into()));
        }
        self.open = true;
        debug!("Replay camera opened ({} reads queued)", self.pending.len());
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        if !self.open {
            return Err(CameraError::NotOpened);
        }

        let slot = self.pending.pop_front().ok_or(CameraError::StreamEnded)?;
        let timestamp_ms = self.frame_timestamp_ms();
        let sequence = self.sequence;
        self.sequence += 1;

        let Some(index) = slot else {
            debug!(sequence, "Replay camera stalled");
            return Ok(None);
        };

        match self.load(index) {
            Ok(mut frame) => {
                frame.timestamp_ms = timestamp_ms;
                frame.sequence = sequence;
                Ok(Some(frame))
            }
            Err(e) => {
                warn!("Replay frame {} failed to load: {}", index, e);
                Err(e)
            }
        }
    }

    fn close(&mut self) {
        if self.open {
            debug!("Replay camera closed");
        }
        self.open = false;
        self.pending.clear();
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(seq: u32) -> VideoFrame {
        VideoFrame::solid(8, 6, [120, 120, 120], 999, seq)
    }

    #[tokio::test]
    async fn test_replay_restamps_frames() {
        let mut cam = ReplayCamera::from_frames(vec![gray(0), gray(0), gray(0)], 10);
        cam.open().await.unwrap();

        let a = cam.read_frame().await.unwrap().unwrap();
        let b = cam.read_frame().await.unwrap().unwrap();
        assert_eq!(a.timestamp_ms, 0);
        assert_eq!(b.timestamp_ms, 100);
        assert_eq!(b.sequence, 1);
    }

    #[tokio::test]
    async fn test_stream_ends() {
        let mut cam = ReplayCamera::from_frames(vec![gray(0)], 10);
        cam.open().await.unwrap();
        assert!(cam.read_frame().await.unwrap().is_some());
        assert_eq!(cam.read_frame().await, Err(CameraError::StreamEnded));
    }

    #[tokio::test]
    async fn test_scripted_stall() {
        let mut cam = ReplayCamera::scripted(vec![Some(gray(0)), None, Some(gray(0))], 10);
        cam.open().await.unwrap();
        assert!(cam.read_frame().await.unwrap().is_some());
        assert!(cam.read_frame().await.unwrap().is_none());
        let third = cam.read_frame().await.unwrap().unwrap();
        assert_eq!(third.timestamp_ms, 200);
    }

    #[tokio::test]
    async fn test_read_before_open() {
        let mut cam = ReplayCamera::from_frames(vec![gray(0)], 10);
        assert_eq!(cam.read_frame().await, Err(CameraError::NotOpened));
    }

    #[tokio::test]
    async fn test_empty_source_is_not_found() {
        let mut cam = ReplayCamera::from_frames(Vec::new(), 10);
        let err = cam.open().await.unwrap_err();
        assert_eq!(err.kind(), crate::CameraErrorKind::DeviceNotFound);
    }

    #[test]
    fn test_missing_dir() {
        let err = ReplayCamera::from_dir("/definitely/not/a/frame/dir", 10).unwrap_err();
        assert_eq!(err.kind(), crate::CameraErrorKind::DeviceNotFound);
    }

    #[tokio::test]
    async fn test_dir_replay_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for (name, value) in [("b.png", 200u8), ("a.png", 50u8)] {
            let img = image::RgbImage::from_pixel(4, 4, image::Rgb([value, value, value]));
            img.save(dir.path().join(name)).unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let mut cam = ReplayCamera::from_dir(dir.path(), 5).unwrap();
        assert_eq!(cam.remaining(), 2);
        cam.open().await.unwrap();

        let first = cam.read_frame().await.unwrap().unwrap();
        assert_eq!(first.get_pixel(0, 0), Some([50, 50, 50]));
        let second = cam.read_frame().await.unwrap().unwrap();
        assert_eq!(second.timestamp_ms, 200);
    }

    #[tokio::test]
    async fn test_config_resizes_files() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::RgbImage::from_pixel(16, 12, image::Rgb([90, 90, 90]));
        img.save(dir.path().join("only.png")).unwrap();

        let config = CameraConfig {
            device: dir.path().display().to_string(),
            width: 8,
            height: 6,
            ..Default::default()
        };
        let mut cam = ReplayCamera::from_config(&config).unwrap();
        cam.open().await.unwrap();

        let frame = cam.read_frame().await.unwrap().unwrap();
        assert_eq!((frame.width, frame.height), (8, 6));
        assert_eq!(frame.get_pixel(7, 5), Some([90, 90, 90]));
    }
}
