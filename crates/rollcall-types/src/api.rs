//! Request and response bodies exchanged with the attendance backend.
//!
//! Field names match the backend's JSON keys exactly.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Faculty,
    Student,
}

impl UserType {
    pub fn as_str(self) -> &'static str {
        match self {
            UserType::Faculty => "faculty",
            UserType::Student => "student",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub user_type: UserType,
    pub user_id: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    #[serde(default)]
    pub redirect: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionStatus {
    pub logged_in: bool,
    #[serde(default)]
    pub user_type: Option<UserType>,
    #[serde(default)]
    pub user_id: Option<String>,
}

/// Body for `/mark_attendance`: either a live camera frame or a test-mode
/// identity pick.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkAttendanceRequest {
    Test {
        test_mode: bool,
        student_id: String,
        subject: String,
    },
    Live {
        image: String,
        subject: String,
    },
}

impl MarkAttendanceRequest {
    pub fn live(image: String, subject: impl Into<String>) -> Self {
        Self::Live {
            image,
            subject: subject.into(),
        }
    }

    pub fn test(student_id: impl Into<String>, subject: impl Into<String>) -> Self {
        Self::Test {
            test_mode: true,
            student_id: student_id.into(),
            subject: subject.into(),
        }
    }

    pub fn subject(&self) -> &str {
        match self {
            Self::Test { subject, .. } | Self::Live { subject, .. } => subject,
        }
    }
}

/// Recognition confidence; the backend sends a number for live recognition
/// and clients sometimes carry a descriptive string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Score(f64),
    Label(String),
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Score(score) => write!(f, "{score}"),
            Confidence::Label(label) => f.write_str(label),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarkAttendanceResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub student_id: Option<String>,
    #[serde(default)]
    pub student_name: Option<String>,
    #[serde(default)]
    pub confidence: Option<Confidence>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterFaceRequest {
    pub image: String,
    pub image_index: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterFaceResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub registered_count: Option<usize>,
}

/// The two status routes the student dashboards query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusEndpoint {
    Registration,
    Face,
}

impl StatusEndpoint {
    pub fn path(self) -> &'static str {
        match self {
            StatusEndpoint::Registration => "/get_face_registration_status",
            StatusEndpoint::Face => "/get_face_status",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaceStatusResponse {
    pub success: bool,
    #[serde(default)]
    pub registered_count: usize,
    #[serde(default)]
    pub total_images: Option<usize>,
    #[serde(default)]
    pub progress_percent: Option<u32>,
    #[serde(default)]
    pub completed: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Plain `{success, message?}` acknowledgment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub marked_by: Option<String>,
}

impl AttendanceEntry {
    pub fn subject_label(&self) -> &str {
        non_empty(&self.subject).unwrap_or("General")
    }

    pub fn date_label(&self) -> &str {
        non_empty(&self.date).unwrap_or("N/A")
    }

    pub fn time_label(&self) -> &str {
        non_empty(&self.time).unwrap_or("N/A")
    }

    pub fn marked_by_label(&self) -> &str {
        non_empty(&self.marked_by).unwrap_or("Faculty")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttendanceHistoryResponse {
    pub success: bool,
    #[serde(default)]
    pub attendance: Vec<AttendanceEntry>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddStudentRequest {
    pub student_id: String,
    pub name: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn mark_requests_serialize_to_backend_shapes() {
        let test = serde_json::to_value(MarkAttendanceRequest::test("S002", "Math")).unwrap();
        assert_eq!(
            test,
            json!({"test_mode": true, "student_id": "S002", "subject": "Math"})
        );

        let live = serde_json::to_value(MarkAttendanceRequest::live(
            "data:image/jpeg;base64,AAAA".into(),
            "Physics",
        ))
        .unwrap();
        assert_eq!(
            live,
            json!({"image": "data:image/jpeg;base64,AAAA", "subject": "Physics"})
        );
    }

    #[test]
    fn confidence_accepts_numbers_and_strings() {
        let numeric: MarkAttendanceResponse = serde_json::from_value(json!({
            "success": true,
            "student_id": "S001",
            "student_name": "John Doe",
            "confidence": 0.87
        }))
        .unwrap();
        assert_eq!(numeric.confidence.unwrap().to_string(), "0.87");

        let labelled: MarkAttendanceResponse = serde_json::from_value(json!({
            "success": true,
            "confidence": "0.95 (Test)"
        }))
        .unwrap();
        assert_eq!(labelled.confidence.unwrap().to_string(), "0.95 (Test)");
    }

    #[test]
    fn attendance_entry_labels_fall_back() {
        let entry: AttendanceEntry =
            serde_json::from_value(json!({"subject": "", "date": "2024-03-01"})).unwrap();
        assert_eq!(entry.subject_label(), "General");
        assert_eq!(entry.date_label(), "2024-03-01");
        assert_eq!(entry.time_label(), "N/A");
        assert_eq!(entry.marked_by_label(), "Faculty");
    }

    #[test]
    fn session_status_tolerates_missing_identity() {
        let status: SessionStatus = serde_json::from_value(json!({"logged_in": false})).unwrap();
        assert!(!status.logged_in);
        assert!(status.user_type.is_none());
    }
}
