use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

pub const DEFAULT_FEED_CAPACITY: usize = 10;
pub const EMPTY_FEED_TEXT: &str = "No attendance records yet.";
pub const REFRESHED_FEED_TEXT: &str = "Attendance records will appear here when marked.";

/// Display projection of one successful attendance mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecordView {
    pub student_id: String,
    pub student_name: String,
    pub subject: String,
    pub time_label: String,
    pub confidence_label: String,
}

impl AttendanceRecordView {
    pub fn headline(&self) -> String {
        format!(
            "{} — {} — {}",
            self.student_name, self.subject, self.confidence_label
        )
    }
}

/// Most-recent-first list of marks with a fixed capacity.
#[derive(Debug, Clone)]
pub struct AttendanceFeed {
    records: VecDeque<AttendanceRecordView>,
    capacity: usize,
    placeholder: &'static str,
}

impl AttendanceFeed {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
            placeholder: EMPTY_FEED_TEXT,
        }
    }

    /// Inserts at the head and returns the record evicted from the tail, if any.
    pub fn push(&mut self, record: AttendanceRecordView) -> Option<AttendanceRecordView> {
        self.records.push_front(record);
        if self.records.len() > self.capacity {
            self.records.pop_back()
        } else {
            None
        }
    }

    pub fn records(&self) -> impl Iterator<Item = &AttendanceRecordView> {
        self.records.iter()
    }

    pub fn latest(&self) -> Option<&AttendanceRecordView> {
        self.records.front()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Text shown in place of the list while it is empty.
    pub fn placeholder(&self) -> Option<&'static str> {
        self.is_empty().then_some(self.placeholder)
    }

    pub fn mark_refreshed(&mut self) {
        self.placeholder = REFRESHED_FEED_TEXT;
    }
}

impl Default for AttendanceFeed {
    fn default() -> Self {
        Self::new(DEFAULT_FEED_CAPACITY)
    }
}
