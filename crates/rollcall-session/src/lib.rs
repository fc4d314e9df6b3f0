//! Inactivity timeout and server-side session checks.

mod clock;
mod monitor;

pub use clock::{ActivityKind, SessionClock, SessionExit, SessionPhase, SessionTransition};
pub use monitor::{SessionEvent, SessionMonitor};

use rollcall_types::RollcallError;

pub fn session_error(message: impl Into<String>) -> RollcallError {
    RollcallError::Session(message.into())
}
