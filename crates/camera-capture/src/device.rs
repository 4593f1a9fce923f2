//! Capture device interface

use async_trait::async_trait;

use crate::{CameraError, VideoFrame};

/// A camera the engine can pull frames from.
///
/// The host owns the device; a tracking session opens it once, reads one
/// frame per tick and closes it on stop.
#[async_trait]
pub trait CaptureDevice: Send {
    /// Open the device and start streaming
    async fn open(&mut self) -> Result<(), CameraError>;

    /// Read the next frame.
    ///
    /// `Ok(None)` means no frame is ready yet (device busy or stalled); the
    /// stream is still alive and the caller should try again next tick.
    async fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError>;

    /// Stop streaming and release the device
    fn close(&mut self);

    /// Check if the device is streaming
    fn is_open(&self) -> bool;
}

#[async_trait]
impl<D: CaptureDevice + ?Sized> CaptureDevice for Box<D> {
    async fn open(&mut self) -> Result<(), CameraError> {
        (**self).open().await
    }

    async fn read_frame(&mut self) -> Result<Option<VideoFrame>, CameraError> {
        (**self).read_frame().await
    }

    fn close(&mut self) {
        (**self).close()
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}
