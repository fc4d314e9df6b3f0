//! Backend API facade and notice fan-out.

use async_trait::async_trait;
use rollcall_types::{
    api::{
        Ack, AddStudentRequest, AttendanceHistoryResponse, ChangePasswordRequest,
        FaceStatusResponse, LoginRequest, LoginResponse, MarkAttendanceRequest,
        MarkAttendanceResponse, RegisterFaceRequest, RegisterFaceResponse, SessionStatus,
        StatusEndpoint,
    },
    Result, RollcallError,
};

mod http;
mod notices;
mod scripted;

pub use http::HttpApiClient;
pub use notices::NoticeBoard;
pub use scripted::{ApiCall, ScriptedApi};

/// Every backend route the client pages call.
///
/// `Err` means transport failure (no usable response); a decoded
/// `success: false` body comes back as `Ok`.
#[async_trait]
pub trait AttendanceApi: Send + Sync {
    async fn login(&self, request: &LoginRequest) -> Result<LoginResponse>;
    async fn check_session(&self) -> Result<SessionStatus>;
    /// Follows a plain GET navigation such as `/logout`.
    async fn navigate(&self, path: &str) -> Result<()>;
    async fn mark_attendance(&self, request: &MarkAttendanceRequest)
        -> Result<MarkAttendanceResponse>;
    async fn register_face(&self, request: &RegisterFaceRequest) -> Result<RegisterFaceResponse>;
    async fn face_status(&self, endpoint: StatusEndpoint) -> Result<FaceStatusResponse>;
    async fn delete_face_data(&self) -> Result<Ack>;
    async fn attendance_history(&self) -> Result<AttendanceHistoryResponse>;
    async fn add_student(&self, request: &AddStudentRequest) -> Result<Ack>;
    async fn change_password(&self, request: &ChangePasswordRequest) -> Result<Ack>;
}

pub fn network_error(message: impl Into<String>) -> RollcallError {
    RollcallError::Network(message.into())
}
