use rollcall_types::Result;

use crate::page_error;

/// State of an action button: label, enabled flag and in-flight marker.
#[derive(Debug, Clone)]
pub struct Trigger {
    idle_label: String,
    label: String,
    enabled: bool,
    busy: bool,
}

impl Trigger {
    pub fn new(label: impl Into<String>) -> Self {
        let label = label.into();
        Self {
            idle_label: label.clone(),
            label,
            enabled: true,
            busy: false,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled && !self.busy
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn set_idle_label(&mut self, label: impl Into<String>) {
        self.idle_label = label.into();
        if !self.busy {
            self.label = self.idle_label.clone();
        }
    }

    /// Marks the trigger busy until the returned guard drops.
    pub fn engage(&mut self, busy_label: &str) -> Result<BusyGuard<'_>> {
        if self.busy {
            return Err(page_error("action already in progress"));
        }
        if !self.enabled {
            return Err(page_error("action is disabled"));
        }
        self.busy = true;
        self.label = busy_label.to_string();
        Ok(BusyGuard { trigger: self })
    }
}

/// Restores the trigger on every exit path, including early returns and
/// cancelled futures.
pub struct BusyGuard<'a> {
    trigger: &'a mut Trigger,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.trigger.busy = false;
        self.trigger.label = self.trigger.idle_label.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_restores_label_and_enables() {
        let mut trigger = Trigger::new("Mark Attendance");
        {
            let _busy = trigger.engage("Marking...").unwrap();
        }
        assert_eq!(trigger.label(), "Mark Attendance");
        assert!(trigger.is_enabled());
    }

    #[test]
    fn guard_restores_after_early_return() {
        fn attempt(trigger: &mut Trigger) -> Result<()> {
            let _busy = trigger.engage("Recognizing...")?;
            Err(page_error("boom"))
        }
        let mut trigger = Trigger::new("Mark Attendance");
        assert!(attempt(&mut trigger).is_err());
        assert!(!trigger.is_busy());
        assert_eq!(trigger.label(), "Mark Attendance");
    }

    #[test]
    fn disabled_trigger_refuses() {
        let mut trigger = Trigger::new("Capture");
        trigger.set_enabled(false);
        assert!(trigger.engage("Registering...").is_err());
        trigger.set_idle_label("All Images Captured");
        assert_eq!(trigger.label(), "All Images Captured");
    }
}
