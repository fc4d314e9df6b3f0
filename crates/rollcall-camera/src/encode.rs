use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use image::{codecs::jpeg::JpegEncoder, ColorType, DynamicImage, ImageBuffer, Rgba};
use rollcall_types::{frame::ImageFrame, Result};

use crate::camera_error;

pub const DATA_URI_PREFIX: &str = "data:image/jpeg;base64,";

fn to_rgba_buffer(frame: &ImageFrame) -> Result<ImageBuffer<Rgba<u8>, Vec<u8>>> {
    if frame.is_empty() {
        return Err(camera_error("cannot encode an empty frame"));
    }
    ImageBuffer::<Rgba<u8>, _>::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| camera_error("frame buffer does not match its dimensions"))
}

/// Encodes a frame as a base64 JPEG data URI, the upload format the
/// backend expects.
pub fn encode_data_uri(frame: &ImageFrame, quality: u8) -> Result<String> {
    let rgb = DynamicImage::ImageRgba8(to_rgba_buffer(frame)?).to_rgb8();
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality.clamp(1, 100))
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), ColorType::Rgb8)
        .map_err(|err| camera_error(format!("jpeg encoding failed: {err}")))?;
    Ok(format!("{DATA_URI_PREFIX}{}", STANDARD.encode(jpeg)))
}

/// Saves a copy of the frame as PNG under `dir`.
pub fn archive_frame(dir: &Path, frame: &ImageFrame, label: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .map_err(|err| camera_error(format!("cannot create capture dir {:?}: {err}", dir)))?;
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
    let path = dir.join(format!("{label}_{timestamp}.png"));
    to_rgba_buffer(frame)?
        .save(&path)
        .map_err(|err| camera_error(format!("failed to save frame: {err}")))?;
    Ok(path)
}
