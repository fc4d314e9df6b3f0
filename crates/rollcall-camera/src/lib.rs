//! Camera abstraction layer: device trait, scoped session, frame encoding.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rollcall_types::{config::CameraConfig, frame::ImageFrame, Result, RollcallError};
use tokio::time::{sleep, Duration};
use tracing::info;

mod directory;
mod encode;
mod session;

pub use directory::DirectoryCamera;
pub use encode::{archive_frame, encode_data_uri, DATA_URI_PREFIX};
pub use session::CameraSession;

/// Aggregated device counters.
#[derive(Debug, Default, Clone)]
pub struct CameraMetrics {
    pub frames_captured: u64,
    pub failed_captures: u64,
    pub last_capture_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait CameraDevice: Send + Sync {
    async fn acquire(&mut self) -> Result<()>;
    async fn capture_frame(&self) -> Result<ImageFrame>;
    /// Stops every track. Must be safe to call more than once.
    fn release(&mut self);
    fn is_active(&self) -> bool;
    fn metrics(&self) -> CameraMetrics;
}

/// Device that renders a moving gradient; used for demos and tests.
pub struct SyntheticCamera {
    config: CameraConfig,
    active: bool,
    deny_access: bool,
    releases: Arc<Mutex<u32>>,
    metrics: Arc<Mutex<CameraMetrics>>,
}

impl SyntheticCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self {
            config,
            active: false,
            deny_access: false,
            releases: Arc::new(Mutex::new(0)),
            metrics: Arc::new(Mutex::new(CameraMetrics::default())),
        }
    }

    /// Simulates a user refusing the camera permission prompt.
    pub fn denied(config: CameraConfig) -> Self {
        Self {
            deny_access: true,
            ..Self::new(config)
        }
    }

    /// Shared counter of completed releases, readable after the device is moved.
    pub fn release_counter(&self) -> Arc<Mutex<u32>> {
        Arc::clone(&self.releases)
    }

    fn render(&self, seed: u64) -> ImageFrame {
        let (width, height) = (self.config.width, self.config.height);
        let mut data = Vec::with_capacity(width as usize * height as usize * 4);
        let shift = (seed as u32).wrapping_mul(7);
        for y in 0..height {
            for x in 0..width {
                data.push(x.wrapping_add(shift) as u8);
                data.push(y.wrapping_add(shift) as u8);
                data.push(x.wrapping_add(y) as u8);
                data.push(255);
            }
        }
        ImageFrame::from_rgba(width, height, data)
    }
}

#[async_trait]
impl CameraDevice for SyntheticCamera {
    async fn acquire(&mut self) -> Result<()> {
        if self.deny_access {
            return Err(camera_error("camera permission denied"));
        }
        info!(
            "Acquiring synthetic camera {}x{}",
            self.config.width, self.config.height
        );
        sleep(Duration::from_millis(5)).await;
        self.active = true;
        Ok(())
    }

    async fn capture_frame(&self) -> Result<ImageFrame> {
        let mut metrics = self
            .metrics
            .lock()
            .map_err(|_| camera_error("failed to lock metrics"))?;
        if !self.active {
            metrics.failed_captures += 1;
            return Err(camera_error("camera not active"));
        }
        let frame = self.render(metrics.frames_captured);
        metrics.frames_captured += 1;
        metrics.last_capture_at = Some(frame.captured_at);
        Ok(frame)
    }

    fn release(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        if let Ok(mut count) = self.releases.lock() {
            *count += 1;
        }
        info!("Synthetic camera released");
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn metrics(&self) -> CameraMetrics {
        self.metrics.lock().map(|m| m.clone()).unwrap_or_default()
    }
}

/// Generate an error aligned with camera semantics.
pub fn camera_error(message: impl Into<String>) -> RollcallError {
    RollcallError::Camera(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> CameraConfig {
        CameraConfig {
            width: 8,
            height: 6,
            jpeg_quality: 80,
            frames_dir: None,
        }
    }

    #[tokio::test]
    async fn synthetic_camera_captures_after_acquire() {
        let mut camera = SyntheticCamera::new(config());
        assert!(camera.capture_frame().await.is_err());
        camera.acquire().await.unwrap();
        let frame = camera.capture_frame().await.unwrap();
        assert_eq!((frame.width, frame.height), (8, 6));
        assert_eq!(frame.data.len(), 8 * 6 * 4);
        let metrics = camera.metrics();
        assert_eq!(metrics.frames_captured, 1);
        assert_eq!(metrics.failed_captures, 1);
    }

    #[test]
    fn synthetic_pattern_wraps_instead_of_overflowing() {
        let camera = SyntheticCamera::new(CameraConfig {
            width: 300,
            height: 2,
            ..config()
        });
        let frame = camera.render(u64::MAX);
        assert_eq!(frame.data.len(), 300 * 2 * 4);
        let shift = (u64::MAX as u32).wrapping_mul(7);
        let last = &frame.data[(300 + 299) * 4..];
        assert_eq!(last[0], 299u32.wrapping_add(shift) as u8);
        assert_eq!(last[1], 1u32.wrapping_add(shift) as u8);
        assert_eq!(last[2], 300u32 as u8);
        assert_eq!(last[3], 255);
    }

    #[tokio::test]
    async fn denied_camera_fails_to_acquire() {
        let mut camera = SyntheticCamera::denied(config());
        let err = camera.acquire().await.unwrap_err();
        assert!(matches!(err, RollcallError::Camera(_)));
        assert!(!camera.is_active());
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let mut camera = SyntheticCamera::new(config());
        let releases = camera.release_counter();
        camera.acquire().await.unwrap();
        camera.release();
        camera.release();
        assert_eq!(*releases.lock().unwrap(), 1);
    }
}
