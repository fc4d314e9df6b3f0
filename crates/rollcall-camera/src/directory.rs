use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use async_trait::async_trait;
use rollcall_types::{frame::ImageFrame, Result};
use tracing::{debug, info};

use crate::{camera_error, CameraDevice, CameraMetrics};

const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

/// Replays still images from a directory, in name order, as camera frames.
pub struct DirectoryCamera {
    dir: PathBuf,
    files: Vec<PathBuf>,
    cursor: AtomicUsize,
    active: bool,
    metrics: Arc<Mutex<CameraMetrics>>,
}

impl DirectoryCamera {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            files: Vec::new(),
            cursor: AtomicUsize::new(0),
            active: false,
            metrics: Arc::new(Mutex::new(CameraMetrics::default())),
        }
    }

    fn scan(dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(dir).map_err(|err| {
            camera_error(format!("cannot open frames directory {}: {err}", dir.display()))
        })?;
        let mut files: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| {
                path.extension()
                    .and_then(|ext| ext.to_str())
                    .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        files.sort();
        Ok(files)
    }

    fn record_failure(&self) {
        if let Ok(mut guard) = self.metrics.lock() {
            guard.failed_captures += 1;
        }
    }
}

#[async_trait]
impl CameraDevice for DirectoryCamera {
    async fn acquire(&mut self) -> Result<()> {
        let files = Self::scan(&self.dir)?;
        if files.is_empty() {
            return Err(camera_error(format!(
                "no png/jpeg frames in {}",
                self.dir.display()
            )));
        }
        info!("Replaying {} frames from {:?}", files.len(), self.dir);
        self.files = files;
        self.active = true;
        Ok(())
    }

    async fn capture_frame(&self) -> Result<ImageFrame> {
        if !self.active {
            self.record_failure();
            return Err(camera_error("camera not active"));
        }
        let index = self.cursor.fetch_add(1, Ordering::Relaxed) % self.files.len();
        let path = &self.files[index];
        debug!("Reading frame {:?}", path);
        let raw = std::fs::read(path).map_err(|err| {
            self.record_failure();
            camera_error(format!("failed to read frame {}: {err}", path.display()))
        })?;
        let img = image::load_from_memory(&raw).map_err(|err| {
            self.record_failure();
            camera_error(format!("failed to decode frame {}: {err}", path.display()))
        })?;
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let frame = ImageFrame::from_rgba(width, height, rgba.into_raw());
        if let Ok(mut guard) = self.metrics.lock() {
            guard.frames_captured += 1;
            guard.last_capture_at = Some(frame.captured_at);
        }
        Ok(frame)
    }

    fn release(&mut self) {
        if self.active {
            info!("Directory camera released: {:?}", self.dir);
        }
        self.active = false;
        self.files.clear();
    }

    fn is_active(&self) -> bool {
        self.active
    }

    fn metrics(&self) -> CameraMetrics {
        self.metrics.lock().map(|m| m.clone()).unwrap_or_default()
    }
}
