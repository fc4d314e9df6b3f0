use async_trait::async_trait;
use rollcall_camera::{CameraDevice, CameraMetrics, DirectoryCamera, SyntheticCamera};
use rollcall_types::{config::RollcallConfig, frame::ImageFrame, Result};

/// Camera picked from config: a directory of stills when `frames_dir` is
/// set, otherwise generated frames.
pub enum FrameSource {
    Directory(DirectoryCamera),
    Synthetic(SyntheticCamera),
}

impl FrameSource {
    pub fn from_config(config: &RollcallConfig) -> Self {
        match &config.camera.frames_dir {
            Some(dir) => FrameSource::Directory(DirectoryCamera::new(dir)),
            None => FrameSource::Synthetic(SyntheticCamera::new(config.camera.clone())),
        }
    }
}

#[async_trait]
impl CameraDevice for FrameSource {
    async fn acquire(&mut self) -> Result<()> {
        match self {
            FrameSource::Directory(camera) => camera.acquire().await,
            FrameSource::Synthetic(camera) => camera.acquire().await,
        }
    }

    async fn capture_frame(&self) -> Result<ImageFrame> {
        match self {
            FrameSource::Directory(camera) => camera.capture_frame().await,
            FrameSource::Synthetic(camera) => camera.capture_frame().await,
        }
    }

    fn release(&mut self) {
        match self {
            FrameSource::Directory(camera) => camera.release(),
            FrameSource::Synthetic(camera) => camera.release(),
        }
    }

    fn is_active(&self) -> bool {
        match self {
            FrameSource::Directory(camera) => camera.is_active(),
            FrameSource::Synthetic(camera) => camera.is_active(),
        }
    }

    fn metrics(&self) -> CameraMetrics {
        match self {
            FrameSource::Directory(camera) => camera.metrics(),
            FrameSource::Synthetic(camera) => camera.metrics(),
        }
    }
}
