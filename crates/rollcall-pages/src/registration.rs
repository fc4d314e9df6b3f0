use std::path::PathBuf;

use rollcall_camera::{
    archive_frame, camera_error, encode_data_uri, CameraDevice, CameraSession,
};
use rollcall_network::{AttendanceApi, NoticeBoard};
use rollcall_types::{
    api::{RegisterFaceRequest, RegisterFaceResponse, StatusEndpoint},
    config::{RegistrationFlavor, ResetScope, RollcallConfig},
    frame::ImageFrame,
    notice::{Notice, NoticeLevel},
    outcome::ActionOutcome,
    registration::{RegistrationProgress, RegistrationState, SlotStatus},
    Result, RollcallError,
};
use tracing::{debug, info, warn};

use crate::trigger::Trigger;

const RESET_DONE: &str = "Registration reset. You can start over.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AngleSpec {
    pub name: &'static str,
    pub icon: &'static str,
    pub instruction: &'static str,
}

pub const ANGLES: [AngleSpec; 4] = [
    AngleSpec { name: "Front View", icon: "👤", instruction: "Look straight at camera" },
    AngleSpec { name: "Left Side", icon: "↖️", instruction: "Turn head slightly left" },
    AngleSpec { name: "Right Side", icon: "↗️", instruction: "Turn head slightly right" },
    AngleSpec { name: "Natural Expression", icon: "😊", instruction: "Smile naturally" },
];

/// Status card for one registration slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotCard {
    pub index: usize,
    pub title: String,
    pub instruction: Option<&'static str>,
    pub status: SlotStatus,
}

/// Student face registration page.
///
/// Captures are appended optimistically and confirmed or rolled back by the
/// server's answer; the server's `registered_count` is authoritative on load.
pub struct FaceRegistration<C: CameraDevice, A: AttendanceApi> {
    api: A,
    notices: NoticeBoard,
    camera: Option<CameraSession<C>>,
    state: RegistrationState,
    flavor: RegistrationFlavor,
    reset_scope: ResetScope,
    trigger: Trigger,
    jpeg_quality: u8,
    archive_dir: Option<PathBuf>,
}

impl<C: CameraDevice, A: AttendanceApi> FaceRegistration<C, A> {
    pub fn new(config: &RollcallConfig, api: A, notices: NoticeBoard) -> Self {
        let state = RegistrationState::new(config.registration.required_images);
        let mut page = Self {
            api,
            notices,
            camera: None,
            state,
            flavor: config.registration.flavor,
            reset_scope: config.registration.reset_scope,
            trigger: Trigger::new(""),
            jpeg_quality: config.camera.jpeg_quality,
            archive_dir: config.ops.capture_dir.as_ref().map(PathBuf::from),
        };
        page.sync_trigger();
        page
    }

    pub async fn attach_camera(&mut self, device: C) -> bool {
        let opened = match CameraSession::open(device).await {
            Ok(session) => {
                self.camera = Some(session);
                true
            }
            Err(err) => {
                warn!("Registration camera unavailable: {err}");
                let message = match self.flavor {
                    RegistrationFlavor::Slots => "Camera access failed. Please ensure you are using HTTPS and have granted camera permissions.",
                    RegistrationFlavor::Angles => "Camera access failed. Please allow camera permissions.",
                };
                self.notices
                    .publish(Notice::persistent(NoticeLevel::Error, message));
                false
            }
        };
        self.sync_trigger();
        opened
    }

    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    pub fn progress(&self) -> RegistrationProgress {
        self.state.progress()
    }

    pub fn progress_text(&self) -> String {
        format!(
            "{}/{} images registered",
            self.state.current_index(),
            self.state.max()
        )
    }

    pub fn capture_label(&self) -> String {
        let index = self.state.current_index();
        let max = self.state.max();
        match (self.flavor, self.state.is_complete()) {
            (RegistrationFlavor::Slots, true) => "All Images Captured".to_string(),
            (RegistrationFlavor::Slots, false) => format!("Capture Image {}/{}", index + 1, max),
            (RegistrationFlavor::Angles, true) => "Registration Complete!".to_string(),
            (RegistrationFlavor::Angles, false) => {
                format!("Capture {} ({}/{})", slot_title(index), index + 1, max)
            }
        }
    }

    pub fn slot_cards(&self) -> Vec<SlotCard> {
        (0..self.state.max())
            .map(|index| {
                let (title, instruction) = match self.flavor {
                    RegistrationFlavor::Slots => (format!("Image {}", index + 1), None),
                    RegistrationFlavor::Angles => (
                        slot_title(index),
                        ANGLES.get(index).map(|angle| angle.instruction),
                    ),
                };
                SlotCard {
                    index,
                    title,
                    instruction,
                    status: self.state.slot_status(index),
                }
            })
            .collect()
    }

    /// Adopts the server's registered count.
    pub async fn load_status(&mut self) -> ActionOutcome {
        let endpoint = match self.flavor {
            RegistrationFlavor::Slots => StatusEndpoint::Registration,
            RegistrationFlavor::Angles => StatusEndpoint::Face,
        };
        let status = match self.api.face_status(endpoint).await {
            Ok(status) => status,
            Err(err) => {
                warn!("Could not load registration status: {err}");
                return ActionOutcome::TransportFailed(err.to_string());
            }
        };
        if !status.success {
            let message = status
                .message
                .unwrap_or_else(|| "registration status unavailable".to_string());
            return ActionOutcome::Rejected(message);
        }

        self.state.reconcile(status.registered_count);
        self.sync_trigger();
        let count = self.state.current_index();
        info!("Registration status loaded: {}", self.progress_text());
        if count > 0 {
            match self.flavor {
                RegistrationFlavor::Slots => self.banner(
                    NoticeLevel::Info,
                    format!("You have {count} images registered."),
                ),
                RegistrationFlavor::Angles => self.feedback(
                    NoticeLevel::Success,
                    format!("Loaded {count} previously registered images"),
                ),
            }
        }
        ActionOutcome::Completed
    }

    pub async fn capture(&mut self) -> ActionOutcome {
        if self.state.is_complete() {
            return match self.flavor {
                RegistrationFlavor::Slots => {
                    let message = "Maximum images captured. You can reset to start over.";
                    self.banner(NoticeLevel::Info, message);
                    ActionOutcome::Refused(message.to_string())
                }
                RegistrationFlavor::Angles => {
                    let message = "🎉 All angles captured! Registration complete.";
                    self.feedback(NoticeLevel::Success, message);
                    ActionOutcome::Refused(message.to_string())
                }
            };
        }

        let frame = match self.grab_frame().await {
            Ok(frame) => frame,
            Err(err) => {
                warn!("Registration capture failed: {err}");
                let message = match self.flavor {
                    RegistrationFlavor::Slots => "Camera not available",
                    RegistrationFlavor::Angles => "Camera not ready",
                };
                self.notify(NoticeLevel::Error, message);
                return ActionOutcome::Refused(message.to_string());
            }
        };
        let image = match encode_data_uri(&frame, self.jpeg_quality) {
            Ok(image) => image,
            Err(err) => return ActionOutcome::Refused(err.to_string()),
        };

        let slot = match self.state.begin_capture(image.clone()) {
            Ok(slot) => slot,
            Err(refusal) => return ActionOutcome::Refused(format!("{refusal:?}")),
        };
        self.archive(&frame, slot);
        debug!("Holding slot {} pending server confirmation", slot);

        let request = RegisterFaceRequest {
            image,
            image_index: slot,
        };
        let busy_label = match self.flavor {
            RegistrationFlavor::Slots => "Registering...",
            RegistrationFlavor::Angles => "Processing...",
        };
        let result = self.send(&request, busy_label).await;
        let outcome = self.settle(slot, result);
        self.sync_trigger();
        outcome
    }

    /// Clears the registration once the user has confirmed.
    pub async fn reset(&mut self, confirmed: bool) -> ActionOutcome {
        if !confirmed {
            return ActionOutcome::Refused("reset not confirmed".to_string());
        }
        if self.state.captured_count() == 0 && self.state.images().is_empty() {
            let message = "No images to reset";
            self.feedback(NoticeLevel::Info, message);
            return ActionOutcome::Refused(message.to_string());
        }

        let outcome = match self.reset_scope {
            ResetScope::LocalOnly => {
                warn!("Clearing local registration only; server images are kept");
                self.state.clear();
                self.notify(NoticeLevel::Info, RESET_DONE);
                ActionOutcome::Completed
            }
            ResetScope::Full => match self.api.delete_face_data().await {
                Ok(ack) if ack.success => {
                    self.state.clear();
                    self.notify(NoticeLevel::Success, RESET_DONE);
                    ActionOutcome::Completed
                }
                Ok(ack) => {
                    self.notify(NoticeLevel::Error, "Error resetting registration");
                    ActionOutcome::Rejected(
                        ack.message
                            .unwrap_or_else(|| "Error resetting registration".to_string()),
                    )
                }
                Err(err) => {
                    warn!("Reset request failed: {err}");
                    self.notify(NoticeLevel::Error, "Network error during reset");
                    ActionOutcome::TransportFailed(err.to_string())
                }
            },
        };
        self.sync_trigger();
        outcome
    }

    pub fn close(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            camera.close();
        }
        self.sync_trigger();
    }

    fn settle(&mut self, slot: usize, result: Result<RegisterFaceResponse>) -> ActionOutcome {
        let number = slot + 1;
        match result {
            Ok(response) if response.success => {
                self.state.confirm();
                if let Some(count) = response.registered_count {
                    debug!("Server reports {} registered images", count);
                }
                match self.flavor {
                    RegistrationFlavor::Slots => self.banner(
                        NoticeLevel::Success,
                        format!("✅ Image {number} registered successfully!"),
                    ),
                    RegistrationFlavor::Angles => self.feedback(
                        NoticeLevel::Success,
                        format!("✅ {} captured successfully!", slot_title(slot)),
                    ),
                }
                if self.state.is_complete() {
                    self.announce_complete();
                }
                ActionOutcome::Completed
            }
            Ok(response) => {
                self.state.rollback();
                let reason = response
                    .message
                    .unwrap_or_else(|| "registration rejected".to_string());
                match self.flavor {
                    RegistrationFlavor::Slots => self.banner(
                        NoticeLevel::Error,
                        format!("❌ Image {number} failed: {reason}"),
                    ),
                    RegistrationFlavor::Angles => {
                        self.feedback(NoticeLevel::Error, format!("❌ Failed: {reason}"))
                    }
                }
                ActionOutcome::Rejected(reason)
            }
            Err(RollcallError::Page(reason)) => {
                self.state.rollback();
                ActionOutcome::Refused(reason)
            }
            Err(err) => {
                self.state.rollback();
                warn!("Registration request failed: {err}");
                match self.flavor {
                    RegistrationFlavor::Slots => {
                        self.banner(NoticeLevel::Error, "Error registering face")
                    }
                    RegistrationFlavor::Angles => {
                        self.feedback(NoticeLevel::Error, "❌ Network error. Please try again.")
                    }
                }
                ActionOutcome::TransportFailed(err.to_string())
            }
        }
    }

    fn announce_complete(&self) {
        info!("Face registration complete");
        match self.flavor {
            RegistrationFlavor::Slots => self.banner(
                NoticeLevel::Success,
                "🎉 All images captured! Face registration complete.",
            ),
            RegistrationFlavor::Angles => {
                self.feedback(
                    NoticeLevel::Success,
                    "🎉 Face registration complete! All angles captured.",
                );
                self.notices.publish(Notice::persistent(
                    NoticeLevel::Success,
                    "Face registration completed successfully! You can now be recognized for attendance.",
                ));
            }
        }
    }

    async fn grab_frame(&self) -> Result<ImageFrame> {
        match &self.camera {
            Some(camera) if camera.is_open() => camera.capture().await,
            _ => Err(camera_error("camera not open")),
        }
    }

    async fn send(
        &mut self,
        request: &RegisterFaceRequest,
        busy_label: &str,
    ) -> Result<RegisterFaceResponse> {
        let _busy = self.trigger.engage(busy_label)?;
        self.api.register_face(request).await
    }

    fn archive(&self, frame: &ImageFrame, slot: usize) {
        if let Some(dir) = &self.archive_dir {
            if let Err(err) = archive_frame(dir, frame, &format!("registration-{}", slot + 1)) {
                warn!("Could not archive frame: {err}");
            }
        }
    }

    /// Only success banners clear themselves; the rest stay until replaced.
    fn banner(&self, level: NoticeLevel, message: impl Into<String>) {
        let notice = match level {
            NoticeLevel::Success => Notice::banner(level, message),
            _ => Notice::persistent(level, message),
        };
        self.notices.publish(notice);
    }

    fn feedback(&self, level: NoticeLevel, message: impl Into<String>) {
        self.notices.publish(Notice::feedback(level, message));
    }

    /// Banner on the slots page, feedback line on the angles page.
    fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        match self.flavor {
            RegistrationFlavor::Slots => self.banner(level, message),
            RegistrationFlavor::Angles => self.feedback(level, message),
        }
    }

    fn sync_trigger(&mut self) {
        let camera_ready = self.camera.as_ref().is_some_and(|c| c.is_open());
        self.trigger
            .set_enabled(camera_ready && !self.state.is_complete());
        let label = self.capture_label();
        self.trigger.set_idle_label(label);
    }
}

fn slot_title(index: usize) -> String {
    ANGLES
        .get(index)
        .map(|angle| angle.name.to_string())
        .unwrap_or_else(|| format!("Angle {}", index + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_camera::SyntheticCamera;
    use rollcall_network::ScriptedApi;
    use rollcall_types::{
        config::CameraConfig,
        notice::{NoticeTarget, BANNER_TTL},
    };
    use serde_json::json;

    fn config(flavor: RegistrationFlavor) -> RollcallConfig {
        let mut config = RollcallConfig::default();
        config.camera = CameraConfig {
            width: 8,
            height: 8,
            jpeg_quality: 80,
            frames_dir: None,
        };
        config.registration.flavor = flavor;
        config
    }

    async fn page(
        api: &ScriptedApi,
        flavor: RegistrationFlavor,
    ) -> FaceRegistration<SyntheticCamera, ScriptedApi> {
        let config = config(flavor);
        let mut page = FaceRegistration::new(&config, api.clone(), NoticeBoard::default());
        assert!(page.attach_camera(SyntheticCamera::new(config.camera)).await);
        page
    }

    #[tokio::test]
    async fn reconciled_count_leaves_exactly_the_remaining_captures() {
        let api = ScriptedApi::new();
        api.respond(
            "/get_face_registration_status",
            json!({"success": true, "registered_count": 2}),
        );
        api.fallback("/register_face", json!({"success": true}));
        let mut page = page(&api, RegistrationFlavor::Slots).await;

        assert_eq!(page.load_status().await, ActionOutcome::Completed);
        assert_eq!(page.progress_text(), "2/4 images registered");
        assert_eq!(page.capture_label(), "Capture Image 3/4");

        assert!(page.capture().await.is_completed());
        assert!(page.capture().await.is_completed());
        assert!(page.state().is_complete());
        assert_eq!(page.capture_label(), "All Images Captured");
        assert!(!page.trigger().is_enabled());

        assert!(matches!(page.capture().await, ActionOutcome::Refused(_)));
        let indices: Vec<_> = api
            .calls()
            .iter()
            .filter(|call| call.path == "/register_face")
            .map(|call| call.body.as_ref().unwrap()["image_index"].clone())
            .collect();
        assert_eq!(indices, vec![json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn rejected_capture_rolls_back_exactly() {
        let api = ScriptedApi::new();
        api.respond("/register_face", json!({"success": true}));
        api.respond(
            "/register_face",
            json!({"success": false, "message": "No face detected"}),
        );
        let mut page = page(&api, RegistrationFlavor::Slots).await;

        assert!(page.capture().await.is_completed());
        let before = (page.state().current_index(), page.state().images().len());

        assert_eq!(
            page.capture().await,
            ActionOutcome::Rejected("No face detected".into())
        );
        assert_eq!(
            (page.state().current_index(), page.state().images().len()),
            before
        );
        assert!(matches!(page.capture().await, ActionOutcome::TransportFailed(_)));
        assert_eq!(
            (page.state().current_index(), page.state().images().len()),
            before
        );
        assert_eq!(page.trigger().label(), "Capture Image 2/4");
        assert!(page.trigger().is_enabled());
    }

    #[tokio::test]
    async fn slots_error_banner_stays_until_replaced() {
        let api = ScriptedApi::new();
        api.respond("/register_face", json!({"success": true}));
        api.respond(
            "/register_face",
            json!({"success": false, "message": "No face detected"}),
        );
        let config = config(RegistrationFlavor::Slots);
        let notices = NoticeBoard::default();
        let mut rx = notices.receiver();
        let mut page = FaceRegistration::new(&config, api.clone(), notices);
        assert!(page.attach_camera(SyntheticCamera::new(config.camera)).await);

        assert!(page.capture().await.is_completed());
        assert!(matches!(page.capture().await, ActionOutcome::Rejected(_)));

        let banners: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .filter(|notice| notice.target == NoticeTarget::Banner)
            .collect();
        let success = banners
            .iter()
            .find(|notice| notice.message == "✅ Image 1 registered successfully!")
            .unwrap();
        assert_eq!(success.ttl, Some(BANNER_TTL));
        let failure = banners
            .iter()
            .find(|notice| notice.message == "❌ Image 2 failed: No face detected")
            .unwrap();
        assert_eq!(failure.level, NoticeLevel::Error);
        assert_eq!(failure.ttl, None);
    }

    #[tokio::test]
    async fn angles_flavor_names_each_slot() {
        let api = ScriptedApi::new();
        api.respond(
            "/get_face_status",
            json!({"success": true, "registered_count": 1}),
        );
        api.fallback("/register_face", json!({"success": true}));
        let mut page = page(&api, RegistrationFlavor::Angles).await;
        page.load_status().await;

        assert_eq!(page.capture_label(), "Capture Left Side (2/4)");
        let cards = page.slot_cards();
        assert_eq!(cards[0].status, SlotStatus::Captured);
        assert_eq!(cards[1].status, SlotStatus::Current);
        assert_eq!(cards[1].instruction, Some("Turn head slightly left"));
        assert_eq!(cards[3].status, SlotStatus::Pending);

        for _ in 0..3 {
            assert!(page.capture().await.is_completed());
        }
        assert_eq!(page.capture_label(), "Registration Complete!");
        assert!(page
            .slot_cards()
            .iter()
            .all(|card| card.status == SlotStatus::Captured));
    }

    #[tokio::test]
    async fn server_count_is_clamped_to_maximum() {
        let api = ScriptedApi::new();
        api.respond(
            "/get_face_registration_status",
            json!({"success": true, "registered_count": 9}),
        );
        let mut page = page(&api, RegistrationFlavor::Slots).await;
        page.load_status().await;
        assert_eq!(page.progress().completed, 4);
        assert!(page.state().is_complete());
    }

    #[tokio::test]
    async fn full_reset_waits_for_server_confirmation() {
        let api = ScriptedApi::new();
        api.respond(
            "/get_face_registration_status",
            json!({"success": true, "registered_count": 3}),
        );
        api.respond("/delete_face_data", json!({"success": false}));
        api.respond("/delete_face_data", json!({"success": true}));
        let mut page = page(&api, RegistrationFlavor::Slots).await;
        page.load_status().await;

        assert_eq!(
            page.reset(false).await,
            ActionOutcome::Refused("reset not confirmed".into())
        );
        assert_eq!(api.calls_to("/delete_face_data"), 0);

        assert!(matches!(page.reset(true).await, ActionOutcome::Rejected(_)));
        assert_eq!(page.state().current_index(), 3);

        assert_eq!(page.reset(true).await, ActionOutcome::Completed);
        assert_eq!(page.state().current_index(), 0);
        assert_eq!(page.capture_label(), "Capture Image 1/4");
    }

    #[tokio::test]
    async fn local_reset_never_calls_the_server() {
        let api = ScriptedApi::new();
        api.fallback("/register_face", json!({"success": true}));
        let mut config = config(RegistrationFlavor::Angles);
        config.registration.reset_scope = ResetScope::LocalOnly;
        let mut page = FaceRegistration::new(&config, api.clone(), NoticeBoard::default());
        page.attach_camera(SyntheticCamera::new(config.camera.clone()))
            .await;

        assert!(matches!(page.reset(true).await, ActionOutcome::Refused(_)));
        page.capture().await;
        assert_eq!(page.reset(true).await, ActionOutcome::Completed);
        assert_eq!(page.state().captured_count(), 0);
        assert_eq!(api.calls_to("/delete_face_data"), 0);
    }

    #[tokio::test]
    async fn denied_camera_disables_capture() {
        let api = ScriptedApi::new();
        let config = config(RegistrationFlavor::Angles);
        let notices = NoticeBoard::default();
        let mut rx = notices.receiver();
        let mut page: FaceRegistration<SyntheticCamera, ScriptedApi> =
            FaceRegistration::new(&config, api.clone(), notices);

        assert!(!page.attach_camera(SyntheticCamera::denied(config.camera)).await);
        assert!(!page.trigger().is_enabled());
        let banner = rx.try_recv().unwrap();
        assert_eq!(banner.target, NoticeTarget::Banner);
        assert_eq!(banner.ttl, None);

        assert_eq!(
            page.capture().await,
            ActionOutcome::Refused("Camera not ready".into())
        );
        assert!(api.calls().is_empty());
    }
}
