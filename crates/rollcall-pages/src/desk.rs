use std::path::PathBuf;

use chrono::Local;
use rollcall_camera::{
    archive_frame, camera_error, encode_data_uri, CameraDevice, CameraSession,
};
use rollcall_network::{AttendanceApi, NoticeBoard};
use rollcall_types::{
    api::{MarkAttendanceRequest, MarkAttendanceResponse},
    attendance::{AttendanceFeed, AttendanceRecordView},
    config::RollcallConfig,
    frame::ImageFrame,
    notice::{Notice, NoticeLevel},
    outcome::ActionOutcome,
    Result, RollcallError,
};
use tracing::{info, warn};

use crate::trigger::Trigger;

const IDLE_LABEL: &str = "Mark Attendance";
const CAMERA_DENIED: &str = "Cannot access camera. Please check permissions.";
const CAMERA_UNAVAILABLE: &str = "Camera not available";
const SELECT_STUDENT: &str = "Please select a student first";
const MARK_FAILED: &str = "Error marking attendance";
const TEST_ENABLED: &str = "Test mode enabled. Select a student to simulate recognition.";
const TEST_DISABLED: &str = "Test mode disabled. Using real face recognition.";
const TEST_CONFIDENCE: &str = "0.95 (Test)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestStudent {
    pub id: &'static str,
    pub name: &'static str,
}

/// Fixed identities offered while test mode is on.
pub const TEST_DIRECTORY: [TestStudent; 4] = [
    TestStudent { id: "S001", name: "John Doe" },
    TestStudent { id: "S002", name: "Jane Smith" },
    TestStudent { id: "S003", name: "Mike Johnson" },
    TestStudent { id: "S004", name: "Sarah Wilson" },
];

pub fn lookup_test_student(id: &str) -> Option<&'static TestStudent> {
    TEST_DIRECTORY.iter().find(|student| student.id == id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    Live,
    /// Simulated recognition from [`TEST_DIRECTORY`]; no camera needed.
    Test,
}

/// Faculty attendance page: camera, subject, mode toggle and the recent
/// marks feed.
pub struct AttendanceDesk<C: CameraDevice, A: AttendanceApi> {
    api: A,
    notices: NoticeBoard,
    camera: Option<CameraSession<C>>,
    camera_failed: bool,
    mode: CaptureMode,
    subject: String,
    test_student: Option<&'static TestStudent>,
    feed: AttendanceFeed,
    trigger: Trigger,
    jpeg_quality: u8,
    archive_dir: Option<PathBuf>,
}

impl<C: CameraDevice, A: AttendanceApi> AttendanceDesk<C, A> {
    pub fn new(config: &RollcallConfig, api: A, notices: NoticeBoard) -> Self {
        let mut desk = Self {
            api,
            notices,
            camera: None,
            camera_failed: false,
            mode: CaptureMode::Live,
            subject: config.capture.default_subject.clone(),
            test_student: None,
            feed: AttendanceFeed::new(config.capture.feed_capacity),
            trigger: Trigger::new(IDLE_LABEL),
            jpeg_quality: config.camera.jpeg_quality,
            archive_dir: config.ops.capture_dir.as_ref().map(PathBuf::from),
        };
        desk.sync_trigger();
        desk
    }

    /// Opens the camera for this page. A refusal leaves a persistent banner
    /// and disables live capture; test mode keeps working.
    pub async fn attach_camera(&mut self, device: C) -> bool {
        match CameraSession::open(device).await {
            Ok(session) => {
                self.camera = Some(session);
                self.camera_failed = false;
            }
            Err(err) => {
                warn!("Attendance camera unavailable: {err}");
                self.camera = None;
                self.camera_failed = true;
                self.notices
                    .publish(Notice::persistent(NoticeLevel::Error, CAMERA_DENIED));
            }
        }
        self.sync_trigger();
        !self.camera_failed
    }

    pub fn mode(&self) -> CaptureMode {
        self.mode
    }

    pub fn toggle_test_mode(&mut self) -> CaptureMode {
        let (mode, message) = match self.mode {
            CaptureMode::Live => (CaptureMode::Test, TEST_ENABLED),
            CaptureMode::Test => (CaptureMode::Live, TEST_DISABLED),
        };
        self.mode = mode;
        self.notices
            .publish(Notice::banner(NoticeLevel::Success, message));
        self.sync_trigger();
        mode
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn select_subject(&mut self, subject: impl Into<String>) {
        self.subject = subject.into();
    }

    /// Returns false for ids outside the test directory.
    pub fn select_test_student(&mut self, id: &str) -> bool {
        self.test_student = lookup_test_student(id);
        self.test_student.is_some()
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn feed(&self) -> &AttendanceFeed {
        &self.feed
    }

    pub fn refresh(&mut self) {
        self.feed.mark_refreshed();
    }

    pub async fn mark(&mut self) -> ActionOutcome {
        match self.mode {
            CaptureMode::Test => self.mark_test().await,
            CaptureMode::Live => self.mark_live().await,
        }
    }

    /// Releases the camera; called when the page goes away.
    pub fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.close();
        }
        self.sync_trigger();
    }

    async fn mark_test(&mut self) -> ActionOutcome {
        let Some(student) = self.test_student else {
            return self.refuse(SELECT_STUDENT);
        };
        let request = MarkAttendanceRequest::test(student.id, self.subject.clone());
        match self.send(&request, "Marking...").await {
            Ok(response) if response.success => {
                self.notices.publish(Notice::banner(
                    NoticeLevel::Success,
                    format!("TEST: Attendance marked for {}", student.name),
                ));
                self.record(AttendanceRecordView {
                    student_id: student.id.to_string(),
                    student_name: student.name.to_string(),
                    subject: self.subject.clone(),
                    time_label: time_label(),
                    confidence_label: TEST_CONFIDENCE.to_string(),
                });
                ActionOutcome::Completed
            }
            other => self.settle_failure(other),
        }
    }

    async fn mark_live(&mut self) -> ActionOutcome {
        let frame = match self.grab_frame().await {
            Ok(frame) => frame,
            Err(err) => {
                warn!("Live capture failed: {err}");
                return self.refuse(CAMERA_UNAVAILABLE);
            }
        };
        let image = match encode_data_uri(&frame, self.jpeg_quality) {
            Ok(image) => image,
            Err(err) => return self.refuse(&err.to_string()),
        };
        self.archive(&frame);

        let request = MarkAttendanceRequest::live(image, self.subject.clone());
        match self.send(&request, "Recognizing...").await {
            Ok(response) if response.success => {
                let message = response
                    .message
                    .clone()
                    .unwrap_or_else(|| "Attendance marked".to_string());
                self.notices
                    .publish(Notice::banner(NoticeLevel::Success, message));
                self.record(AttendanceRecordView {
                    student_id: response.student_id.unwrap_or_default(),
                    student_name: response
                        .student_name
                        .unwrap_or_else(|| "Unknown".to_string()),
                    subject: self.subject.clone(),
                    time_label: time_label(),
                    confidence_label: response
                        .confidence
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "N/A".to_string()),
                });
                ActionOutcome::Completed
            }
            other => self.settle_failure(other),
        }
    }

    async fn grab_frame(&self) -> Result<ImageFrame> {
        match &self.camera {
            Some(camera) if camera.is_open() => camera.capture().await,
            _ => Err(camera_error(CAMERA_UNAVAILABLE)),
        }
    }

    async fn send(
        &mut self,
        request: &MarkAttendanceRequest,
        busy_label: &str,
    ) -> Result<MarkAttendanceResponse> {
        let _busy = self.trigger.engage(busy_label)?;
        self.api.mark_attendance(request).await
    }

    fn settle_failure(&self, result: Result<MarkAttendanceResponse>) -> ActionOutcome {
        match result {
            Ok(response) => {
                let message = response
                    .message
                    .unwrap_or_else(|| "Attendance was not marked".to_string());
                self.notices
                    .publish(Notice::banner(NoticeLevel::Error, message.clone()));
                ActionOutcome::Rejected(message)
            }
            Err(RollcallError::Page(reason)) => ActionOutcome::Refused(reason),
            Err(err) => {
                warn!("Attendance request failed: {err}");
                self.notices
                    .publish(Notice::banner(NoticeLevel::Error, MARK_FAILED));
                ActionOutcome::TransportFailed(err.to_string())
            }
        }
    }

    fn record(&mut self, record: AttendanceRecordView) {
        info!("Attendance marked: {}", record.headline());
        if let Some(evicted) = self.feed.push(record) {
            info!("Feed full; dropped {}", evicted.headline());
        }
    }

    fn refuse(&self, message: &str) -> ActionOutcome {
        self.notices
            .publish(Notice::banner(NoticeLevel::Error, message));
        ActionOutcome::Refused(message.to_string())
    }

    fn archive(&self, frame: &ImageFrame) {
        if let Some(dir) = &self.archive_dir {
            if let Err(err) = archive_frame(dir, frame, "attendance") {
                warn!("Could not archive frame: {err}");
            }
        }
    }

    fn sync_trigger(&mut self) {
        let live_ready = self.camera.as_ref().is_some_and(|c| c.is_open());
        let enabled = match self.mode {
            CaptureMode::Test => true,
            CaptureMode::Live => live_ready || !self.camera_failed,
        };
        self.trigger.set_enabled(enabled);
    }
}

fn time_label() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_camera::SyntheticCamera;
    use rollcall_network::ScriptedApi;
    use rollcall_types::{
        attendance::{EMPTY_FEED_TEXT, REFRESHED_FEED_TEXT},
        config::CameraConfig,
    };
    use serde_json::json;

    fn config() -> RollcallConfig {
        let mut config = RollcallConfig::default();
        config.camera = CameraConfig {
            width: 8,
            height: 8,
            jpeg_quality: 80,
            frames_dir: None,
        };
        config
    }

    fn desk(api: &ScriptedApi) -> AttendanceDesk<SyntheticCamera, ScriptedApi> {
        AttendanceDesk::new(&config(), api.clone(), NoticeBoard::default())
    }

    #[tokio::test]
    async fn test_mode_mark_prepends_local_record() {
        let api = ScriptedApi::new();
        api.respond(
            "/mark_attendance",
            json!({
                "success": true,
                "student_id": "S002",
                "student_name": "Jane Smith",
                "confidence": "0.95 (Test)"
            }),
        );
        let mut desk = desk(&api);
        assert_eq!(desk.toggle_test_mode(), CaptureMode::Test);
        assert!(desk.select_test_student("S002"));
        desk.select_subject("Math");

        assert_eq!(desk.mark().await, ActionOutcome::Completed);
        assert_eq!(
            desk.feed().latest().unwrap().headline(),
            "Jane Smith — Math — 0.95 (Test)"
        );
        assert_eq!(
            api.calls()[0].body,
            Some(json!({"test_mode": true, "student_id": "S002", "subject": "Math"}))
        );
        assert_eq!(desk.trigger().label(), IDLE_LABEL);
        assert!(desk.trigger().is_enabled());
    }

    #[tokio::test]
    async fn test_mode_without_student_sends_nothing() {
        let api = ScriptedApi::new();
        let mut desk = desk(&api);
        desk.toggle_test_mode();
        assert!(!desk.select_test_student("S999"));
        assert_eq!(
            desk.mark().await,
            ActionOutcome::Refused(SELECT_STUDENT.into())
        );
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn live_mark_uses_server_identity() {
        let api = ScriptedApi::new();
        api.respond(
            "/mark_attendance",
            json!({
                "success": true,
                "message": "Attendance marked for John Doe",
                "student_id": "S001",
                "student_name": "John Doe",
                "confidence": 0.87
            }),
        );
        let mut desk = desk(&api);
        let camera = SyntheticCamera::new(config().camera);
        assert!(desk.attach_camera(camera).await);

        assert_eq!(desk.mark().await, ActionOutcome::Completed);
        let record = desk.feed().latest().unwrap();
        assert_eq!(record.student_id, "S001");
        assert_eq!(record.confidence_label, "0.87");
        let body = api.calls()[0].body.clone().unwrap();
        assert!(body["image"]
            .as_str()
            .unwrap()
            .starts_with("data:image/jpeg;base64,"));
        assert_eq!(body["subject"], "General");
    }

    #[tokio::test]
    async fn live_mark_without_camera_is_refused() {
        let api = ScriptedApi::new();
        let mut desk = desk(&api);
        assert_eq!(
            desk.mark().await,
            ActionOutcome::Refused(CAMERA_UNAVAILABLE.into())
        );
        assert!(api.calls().is_empty());
    }

    #[tokio::test]
    async fn denied_camera_disables_live_capture_only() {
        let api = ScriptedApi::new();
        let notices = NoticeBoard::default();
        let mut rx = notices.receiver();
        let mut desk: AttendanceDesk<SyntheticCamera, ScriptedApi> =
            AttendanceDesk::new(&config(), api.clone(), notices);
        assert!(!desk.attach_camera(SyntheticCamera::denied(config().camera)).await);
        let banner = rx.try_recv().unwrap();
        assert_eq!(banner.message, CAMERA_DENIED);
        assert_eq!(banner.ttl, None);
        assert!(!desk.trigger().is_enabled());

        desk.toggle_test_mode();
        assert!(desk.trigger().is_enabled());
    }

    #[tokio::test]
    async fn server_rejection_and_transport_failure() {
        let api = ScriptedApi::new();
        api.respond(
            "/mark_attendance",
            json!({"success": false, "message": "Face not recognized"}),
        );
        let mut desk = desk(&api);
        desk.toggle_test_mode();
        desk.select_test_student("S001");

        assert_eq!(
            desk.mark().await,
            ActionOutcome::Rejected("Face not recognized".into())
        );
        assert!(matches!(
            desk.mark().await,
            ActionOutcome::TransportFailed(_)
        ));
        assert!(desk.feed().is_empty());
        assert!(!desk.trigger().is_busy());
    }

    #[tokio::test]
    async fn refresh_swaps_the_empty_feed_text() {
        let api = ScriptedApi::new();
        api.fallback("/mark_attendance", json!({"success": true}));
        let mut desk = desk(&api);
        assert_eq!(desk.feed().placeholder(), Some(EMPTY_FEED_TEXT));

        desk.refresh();
        assert_eq!(desk.feed().placeholder(), Some(REFRESHED_FEED_TEXT));
        assert!(api.calls().is_empty());

        desk.toggle_test_mode();
        desk.select_test_student("S001");
        desk.select_subject("Physics");
        assert!(desk.mark().await.is_completed());
        desk.refresh();
        assert_eq!(desk.feed().len(), 1);
        assert_eq!(desk.feed().placeholder(), None);
    }

    #[tokio::test]
    async fn eleventh_mark_evicts_the_oldest() {
        let api = ScriptedApi::new();
        api.fallback("/mark_attendance", json!({"success": true}));
        let mut desk = desk(&api);
        desk.toggle_test_mode();
        for (i, student) in TEST_DIRECTORY.iter().cycle().take(11).enumerate() {
            desk.select_test_student(student.id);
            desk.select_subject(format!("Lecture {i}"));
            assert!(desk.mark().await.is_completed());
        }
        let subjects: Vec<_> = desk.feed().records().map(|r| r.subject.clone()).collect();
        assert_eq!(subjects.len(), 10);
        assert_eq!(subjects[0], "Lecture 10");
        assert_eq!(subjects[9], "Lecture 1");
    }

    #[tokio::test]
    async fn close_releases_the_camera_once() {
        let api = ScriptedApi::new();
        let camera = SyntheticCamera::new(config().camera);
        let releases = camera.release_counter();
        let mut desk = desk(&api);
        desk.attach_camera(camera).await;
        desk.close();
        drop(desk);
        assert_eq!(*releases.lock().unwrap(), 1);
    }
}
