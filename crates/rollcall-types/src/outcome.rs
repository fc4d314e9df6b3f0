use serde::{Deserialize, Serialize};

/// Result of one user action against a page controller.
///
/// Only `Completed` means the server acknowledged the action. The other
/// variants are terminal for that action; nothing is retried.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionOutcome {
    Completed,
    /// A local precondition failed (validation, missing camera, limit
    /// reached) and no request was sent.
    Refused(String),
    /// The server answered `success: false`.
    Rejected(String),
    /// The request never produced a usable response.
    TransportFailed(String),
}

impl ActionOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ActionOutcome::Completed)
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            ActionOutcome::Completed => None,
            ActionOutcome::Refused(msg)
            | ActionOutcome::Rejected(msg)
            | ActionOutcome::TransportFailed(msg) => Some(msg),
        }
    }
}
