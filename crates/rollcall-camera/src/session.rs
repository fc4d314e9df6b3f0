use rollcall_types::{frame::ImageFrame, Result};
use tracing::{info, warn};

use crate::{camera_error, CameraDevice, CameraMetrics};

/// Camera held for the lifetime of one page.
///
/// The device is acquired once in [`CameraSession::open`] and released
/// exactly once, either by [`CameraSession::close`] or on drop.
pub struct CameraSession<C: CameraDevice> {
    device: Option<C>,
}

impl<C: CameraDevice> CameraSession<C> {
    pub async fn open(mut device: C) -> Result<Self> {
        if let Err(err) = device.acquire().await {
            warn!("Camera acquisition failed: {err}");
            device.release();
            return Err(err);
        }
        info!("Camera session opened");
        Ok(Self {
            device: Some(device),
        })
    }

    pub async fn capture(&self) -> Result<ImageFrame> {
        match &self.device {
            Some(device) => device.capture_frame().await,
            None => Err(camera_error("camera session closed")),
        }
    }

    pub fn is_open(&self) -> bool {
        self.device.as_ref().map(|d| d.is_active()).unwrap_or(false)
    }

    pub fn metrics(&self) -> CameraMetrics {
        self.device
            .as_ref()
            .map(|d| d.metrics())
            .unwrap_or_default()
    }

    pub fn close(&mut self) {
        if let Some(mut device) = self.device.take() {
            device.release();
            info!("Camera session closed");
        }
    }
}

impl<C: CameraDevice> Drop for CameraSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}
