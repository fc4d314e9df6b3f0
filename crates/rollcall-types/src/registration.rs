//! Local mirror of the server's face-registration progress.
//!
//! A slot only counts as captured after the server acknowledges it. The
//! pending image from an in-flight capture is either confirmed or rolled
//! back as a unit.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::frame::CapturedImage;

pub const DEFAULT_REQUIRED_IMAGES: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistrationProgress {
    pub completed: usize,
    pub total: usize,
}

impl RegistrationProgress {
    pub fn percent(&self) -> u32 {
        if self.total == 0 {
            return 0;
        }
        ((self.completed * 100) / self.total) as u32
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotStatus {
    Captured,
    Current,
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureRefusal {
    LimitReached,
    InFlight,
}

#[derive(Debug, Clone)]
pub struct RegistrationState {
    current_index: usize,
    max: usize,
    captured: BTreeSet<usize>,
    images: Vec<CapturedImage>,
    pending: Option<usize>,
}

impl RegistrationState {
    pub fn new(max: usize) -> Self {
        Self {
            current_index: 0,
            max,
            captured: BTreeSet::new(),
            images: Vec::new(),
            pending: None,
        }
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn max(&self) -> usize {
        self.max
    }

    pub fn is_complete(&self) -> bool {
        self.current_index >= self.max
    }

    pub fn captured_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.captured.iter().copied()
    }

    pub fn captured_count(&self) -> usize {
        self.captured.len()
    }

    /// Images captured in this page view, including a pending one.
    pub fn images(&self) -> &[CapturedImage] {
        &self.images
    }

    pub fn progress(&self) -> RegistrationProgress {
        RegistrationProgress {
            completed: self.current_index,
            total: self.max,
        }
    }

    pub fn slot_status(&self, slot: usize) -> SlotStatus {
        if self.captured.contains(&slot) {
            SlotStatus::Captured
        } else if slot == self.current_index && !self.is_complete() {
            SlotStatus::Current
        } else {
            SlotStatus::Pending
        }
    }

    /// Adopts the server's count as the authoritative state.
    pub fn reconcile(&mut self, registered_count: usize) {
        let count = registered_count.min(self.max);
        self.current_index = count;
        self.captured = (0..count).collect();
        self.images.retain(|image| image.slot_index < count);
        self.pending = None;
    }

    /// Optimistically holds `image` for the current slot and returns that slot.
    pub fn begin_capture(
        &mut self,
        data_uri: String,
    ) -> std::result::Result<usize, CaptureRefusal> {
        if self.pending.is_some() {
            return Err(CaptureRefusal::InFlight);
        }
        if self.is_complete() {
            return Err(CaptureRefusal::LimitReached);
        }
        let slot = self.current_index;
        self.images.push(CapturedImage::new(data_uri, slot));
        self.pending = Some(slot);
        Ok(slot)
    }

    /// Server acknowledged the pending capture.
    pub fn confirm(&mut self) -> Option<usize> {
        let slot = self.pending.take()?;
        self.captured.insert(slot);
        self.current_index = (slot + 1).min(self.max);
        Some(slot)
    }

    /// Drops the pending image; index and captured set are untouched.
    pub fn rollback(&mut self) -> Option<CapturedImage> {
        let slot = self.pending.take()?;
        let position = self
            .images
            .iter()
            .rposition(|image| image.slot_index == slot)?;
        Some(self.images.remove(position))
    }

    pub fn clear(&mut self) {
        self.current_index = 0;
        self.captured.clear();
        self.images.clear();
        self.pending = None;
    }
}
