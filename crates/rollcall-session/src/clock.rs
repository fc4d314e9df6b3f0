use std::time::Duration;

use rollcall_types::config::SessionConfig;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

/// User signals that count as activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivityKind {
    PointerDown,
    PointerMove,
    KeyPress,
    Scroll,
    TouchStart,
    Click,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Active,
    Warning { deadline: Instant },
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionExit {
    /// Local inactivity ran out.
    TimedOut,
    /// The server reported the session as logged out.
    Invalidated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    WarningShown { remaining: Duration },
    /// User acknowledged the warning.
    Extended,
    /// Activity arrived while the warning was up.
    Dismissed,
    Expired(SessionExit),
}

/// Pure session state machine. Callers pass the current instant, so the
/// same logic runs under real and paused clocks.
#[derive(Debug, Clone)]
pub struct SessionClock {
    timeout: Duration,
    warning_after: Duration,
    countdown: Duration,
    last_activity: Instant,
    phase: SessionPhase,
    exit: Option<SessionExit>,
}

impl SessionClock {
    pub fn new(config: &SessionConfig, now: Instant) -> Self {
        Self {
            timeout: config.timeout(),
            warning_after: config.warning_after(),
            countdown: config.warning_window(),
            last_activity: now,
            phase: SessionPhase::Active,
            exit: None,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn exit(&self) -> Option<SessionExit> {
        self.exit
    }

    pub fn is_terminated(&self) -> bool {
        self.exit.is_some()
    }

    pub fn last_activity(&self) -> Instant {
        self.last_activity
    }

    pub fn record_activity(&mut self, now: Instant) -> Option<SessionTransition> {
        if self.is_terminated() {
            return None;
        }
        let was_warning = matches!(self.phase, SessionPhase::Warning { .. });
        self.reset(now);
        was_warning.then_some(SessionTransition::Dismissed)
    }

    pub fn continue_session(&mut self, now: Instant) -> Option<SessionTransition> {
        if self.is_terminated() {
            return None;
        }
        self.reset(now);
        Some(SessionTransition::Extended)
    }

    pub fn tick(&mut self, now: Instant) -> Option<SessionTransition> {
        if self.is_terminated() {
            return None;
        }
        let idle = now.saturating_duration_since(self.last_activity);
        if idle >= self.timeout {
            return self.terminate(SessionExit::TimedOut);
        }
        match self.phase {
            SessionPhase::Active if idle >= self.warning_after => {
                self.phase = SessionPhase::Warning {
                    deadline: now + self.countdown,
                };
                Some(SessionTransition::WarningShown {
                    remaining: self.countdown,
                })
            }
            SessionPhase::Warning { deadline } if now >= deadline => {
                self.terminate(SessionExit::TimedOut)
            }
            _ => None,
        }
    }

    pub fn server_status(&mut self, logged_in: bool) -> Option<SessionTransition> {
        if logged_in {
            return None;
        }
        self.terminate(SessionExit::Invalidated)
    }

    pub fn countdown_remaining(&self, now: Instant) -> Option<Duration> {
        match self.phase {
            SessionPhase::Warning { deadline } => Some(deadline.saturating_duration_since(now)),
            _ => None,
        }
    }

    /// `m:ss`, rounded up to the next whole second.
    pub fn countdown_label(&self, now: Instant) -> Option<String> {
        self.countdown_remaining(now).map(format_countdown)
    }

    fn reset(&mut self, now: Instant) {
        self.last_activity = now;
        self.phase = SessionPhase::Active;
    }

    fn terminate(&mut self, exit: SessionExit) -> Option<SessionTransition> {
        if self.exit.is_some() {
            return None;
        }
        self.exit = Some(exit);
        self.phase = SessionPhase::Expired;
        Some(SessionTransition::Expired(exit))
    }
}

pub(crate) fn format_countdown(remaining: Duration) -> String {
    let secs = remaining.as_millis().div_ceil(1000) as u64;
    format!("{}:{:02}", secs / 60, secs % 60)
}
