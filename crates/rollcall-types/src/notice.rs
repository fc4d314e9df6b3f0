//! Transient user-facing messages shared by every page.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    Success,
    Error,
    Info,
    Warning,
}

/// Where a notice is displayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeTarget {
    /// Page result area.
    Banner,
    /// Short line under the capture control.
    Feedback,
    /// Floating session toast.
    Toast,
    /// Inline error next to a named form field.
    Field(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: Uuid,
    pub level: NoticeLevel,
    pub target: NoticeTarget,
    pub message: String,
    pub created_at: DateTime<Utc>,
    /// `None` keeps the notice until replaced.
    pub ttl: Option<Duration>,
}

pub const BANNER_TTL: Duration = Duration::from_secs(5);
pub const FEEDBACK_TTL: Duration = Duration::from_secs(5);
pub const TOAST_TTL: Duration = Duration::from_secs(3);
pub const LOGIN_MESSAGE_TTL: Duration = Duration::from_secs(3);

impl Notice {
    pub fn new(level: NoticeLevel, target: NoticeTarget, message: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            level,
            target,
            message: message.into(),
            created_at: Utc::now(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn banner(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self::new(level, NoticeTarget::Banner, message).with_ttl(BANNER_TTL)
    }

    /// Banner that stays up, used for device failures.
    pub fn persistent(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self::new(level, NoticeTarget::Banner, message)
    }

    pub fn feedback(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self::new(level, NoticeTarget::Feedback, message).with_ttl(FEEDBACK_TTL)
    }

    pub fn toast(level: NoticeLevel, message: impl Into<String>) -> Self {
        Self::new(level, NoticeTarget::Toast, message).with_ttl(TOAST_TTL)
    }

    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeLevel::Error, NoticeTarget::Field(name.into()), message)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.ttl.and_then(|ttl| chrono::Duration::from_std(ttl).ok()) {
            Some(ttl) => now >= self.created_at + ttl,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn persistent_notices_never_expire() {
        let notice = Notice::persistent(NoticeLevel::Error, "Camera not available");
        let later = notice.created_at + chrono::Duration::hours(1);
        assert!(!notice.is_expired(later));
    }

    #[test]
    fn toasts_expire_after_three_seconds() {
        let notice = Notice::toast(NoticeLevel::Success, "Session extended successfully!");
        assert!(!notice.is_expired(notice.created_at + chrono::Duration::seconds(2)));
        assert!(notice.is_expired(notice.created_at + chrono::Duration::seconds(3)));
    }
}
