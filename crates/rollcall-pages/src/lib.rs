//! Page controllers: each mirrors one screen of the attendance web app and
//! owns its own state, camera and trigger.

mod account;
mod desk;
mod history;
mod login;
mod registration;
mod trigger;

pub use account::{AccountForms, NewStudent};
pub use desk::{lookup_test_student, AttendanceDesk, CaptureMode, TestStudent, TEST_DIRECTORY};
pub use history::{AttendanceHistory, HistoryView};
pub use login::{LoginController, LoginOutcome};
pub use registration::{AngleSpec, FaceRegistration, SlotCard, ANGLES};
pub use trigger::{BusyGuard, Trigger};

use rollcall_types::RollcallError;

pub fn page_error(message: impl Into<String>) -> RollcallError {
    RollcallError::Page(message.into())
}
