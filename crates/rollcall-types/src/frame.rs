use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageFrame {
    pub width: u32,
    pub height: u32,
    /// Raw RGBA pixel buffer.
    pub data: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl ImageFrame {
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> Self {
        Self {
            width,
            height,
            data,
            captured_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0 || self.data.is_empty()
    }
}

/// A frame already encoded for upload, tied to the registration slot it
/// was captured for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedImage {
    pub data_uri: String,
    pub slot_index: usize,
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    pub fn new(data_uri: String, slot_index: usize) -> Self {
        Self {
            data_uri,
            slot_index,
            captured_at: Utc::now(),
        }
    }
}
